//! Audit log browsing. Admin only.

use axum::extract::{Query, State};
use axum::Json;
use kehila_db::models::audit::{AuditLog, AuditQuery};
use kehila_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/audit
///
/// Filter by `user_id`, `action_type`, `entity_type`, `entity_id`; newest
/// first.
pub async fn query_audit_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    let entries = AuditLogRepo::query(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: entries }))
}
