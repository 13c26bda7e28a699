pub mod admin;
pub mod auth;
pub mod community;
pub mod health;
pub mod public;
pub mod requests;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                     WebSocket (?token= optional)
///
/// /auth/login                             login (public)
/// /auth/me                                current user
///
/// /public/requests                        anonymous submission (POST)
/// /public/requests/{reference_number}     track by reference (GET)
/// /public/categories                      active categories (GET)
/// /categories                             active categories (GET)
///
/// /requests                               list, create (auth required)
/// /requests/stats/summary                 dashboard counters (viewer+)
/// /requests/{id}                          get, update, delete
/// /requests/{id}/status                   change status (PATCH)
/// /requests/{id}/assign                   assign (PATCH)
/// /requests/{id}/comment                  add comment (POST)
/// /requests/{id}/updates                  history (GET)
/// /inquiries/...                          same as /requests
///
/// /transactions                           list, create
/// /transactions/summary                   totals (GET)
/// /transactions/{id}                      get, update, delete
/// /meetings                               list, create
/// /meetings/{id}                          get, update, delete
/// /projects                               list, create
/// /projects/{id}                          get, update, delete
/// /employees                              list (?active=), create
/// /employees/{id}                         get, update, delete
/// /employees/{id}/attendance              list (?from=&to=), record day (POST)
/// /employees/{id}/attendance/{aid}        delete
///
/// /admin/users                            list, create (admin only)
/// /admin/users/{id}                       get, update
/// /admin/users/{id}/reset-password        reset password
/// /admin/settings                         list
/// /admin/settings/{key}                   upsert (PUT)
/// /admin/notifications                    delivery records
/// /admin/audit                            audit log
/// /admin/backups                          list, snapshot now (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        // Anonymous submission and tracking.
        .nest("/public", public::router())
        .route("/categories", get(handlers::categories::list_categories))
        // Requests, under both names.
        .nest("/requests", requests::router())
        .nest("/inquiries", requests::router())
        // Community dashboard.
        .nest("/transactions", community::transactions_router())
        .nest("/meetings", community::meetings_router())
        .nest("/projects", community::projects_router())
        .nest("/employees", community::employees_router())
        .nest("/admin", admin::router())
}
