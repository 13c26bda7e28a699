//! Outbound notification records, for checking what was sent and what failed.

use axum::extract::{Query, State};
use axum::Json;
use kehila_core::channels::{
    CHANNEL_EMAIL, CHANNEL_WHATSAPP, STATUS_FAILED, STATUS_PENDING, STATUS_SENT,
};
use kehila_core::error::CoreError;
use kehila_db::models::notification::{Notification, NotificationListParams};
use kehila_db::repositories::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/notifications?status=&channel=&request_id=
pub async fn list_notifications(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    if let Some(status) = params.status.as_deref() {
        if ![STATUS_PENDING, STATUS_SENT, STATUS_FAILED].contains(&status) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown notification status '{status}'"
            ))));
        }
    }
    if let Some(channel) = params.channel.as_deref() {
        if ![CHANNEL_EMAIL, CHANNEL_WHATSAPP].contains(&channel) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown notification channel '{channel}'"
            ))));
        }
    }

    let records = NotificationRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: records }))
}
