//! Route definitions for `/admin`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{audit, backups, notifications, settings, users};
use crate::state::AppState;

/// Routes mounted at `/admin`. Role checks happen in the handler
/// extractors; managing admin accounts additionally needs `super_admin`.
///
/// ```text
/// GET, POST  /users                        -> list_users, create_user
/// GET, PUT   /users/{id}                   -> get_user, update_user
/// POST       /users/{id}/reset-password    -> reset_password
///
/// GET        /settings                     -> list_settings
/// PUT        /settings/{key}               -> upsert_setting
///
/// GET        /notifications                -> list_notifications
/// GET        /audit                        -> query_audit_logs
///
/// GET, POST  /backups                      -> list_backups, create_backup
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        .route("/users/{id}/reset-password", post(users::reset_password))
        .route("/settings", get(settings::list_settings))
        .route("/settings/{key}", put(settings::upsert_setting))
        .route("/notifications", get(notifications::list_notifications))
        .route("/audit", get(audit::query_audit_logs))
        .route(
            "/backups",
            get(backups::list_backups).post(backups::create_backup),
        )
}
