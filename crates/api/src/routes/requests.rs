//! Route definitions for citizen requests.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::requests;
use crate::state::AppState;

/// Routes mounted at `/requests` and again at `/inquiries`.
///
/// ```text
/// GET, POST               /                 -> list_requests, create_request
/// GET                     /stats/summary    -> stats_summary (viewer+)
/// GET, PUT, PATCH, DELETE /{id}             -> get, update (staff+), delete (admin+)
/// PATCH                   /{id}/status      -> change_status (staff+)
/// PATCH                   /{id}/assign      -> assign_request (staff+)
/// POST                    /{id}/comment     -> add_comment
/// GET                     /{id}/updates     -> list_updates
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/stats/summary", get(requests::stats_summary))
        .route(
            "/{id}",
            get(requests::get_request)
                .put(requests::update_request)
                .patch(requests::update_request)
                .delete(requests::delete_request),
        )
        .route("/{id}/status", patch(requests::change_status))
        .route("/{id}/assign", patch(requests::assign_request))
        .route("/{id}/comment", post(requests::add_comment))
        .route("/{id}/updates", get(requests::list_updates))
}
