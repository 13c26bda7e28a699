//! Unauthenticated routes.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{categories, public};
use crate::state::AppState;

/// Routes mounted at `/public`.
///
/// ```text
/// POST /requests                       -> submit_request
/// GET  /requests/{reference_number}    -> track_request
/// GET  /categories                     -> list_categories
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(public::submit_request))
        .route("/requests/{reference_number}", get(public::track_request))
        .route("/categories", get(categories::list_categories))
}
