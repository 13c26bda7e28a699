//! HTTP handlers, one module per resource.

pub mod audit;
pub mod auth;
pub mod backups;
pub mod categories;
pub mod employees;
pub mod meetings;
pub mod notifications;
pub mod projects;
pub mod public;
pub mod requests;
pub mod settings;
pub mod transactions;
pub mod users;

use serde::{Deserialize, Serialize};
use serde_json::json;
use kehila_core::realtime::Channel;
use kehila_core::types::DbId;
use kehila_db::models::audit::CreateAuditLog;
use kehila_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::state::AppState;

/// `?limit=&offset=` for plain paginated lists.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Audit entry for a change made through the API by `user`.
pub(crate) fn audit_entry(
    user: &AuthUser,
    ip: &ClientIp,
    action_type: &str,
    entity_type: &str,
    entity_id: Option<DbId>,
    details: serde_json::Value,
) -> CreateAuditLog {
    CreateAuditLog {
        user_id: Some(user.user_id),
        action_type: action_type.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        details_json: Some(details),
        ip_address: ip.0.clone(),
    }
}

/// Write an audit entry for a change made through the API.
pub(crate) async fn record_audit(
    state: &AppState,
    user: &AuthUser,
    ip: &ClientIp,
    action_type: &str,
    entity_type: &str,
    entity_id: Option<DbId>,
    details: serde_json::Value,
) -> AppResult<()> {
    AuditLogRepo::create(
        &state.pool,
        &audit_entry(user, ip, action_type, entity_type, entity_id, details),
    )
    .await?;
    Ok(())
}

/// Broadcast a budget, meeting, project or staff change on the dashboard
/// channel.
///
/// The payload is `{ "action": "created" | "updated" | "deleted" | "recorded", "item": ... }`.
pub(crate) async fn broadcast_dashboard<T: Serialize>(
    state: &AppState,
    event: &str,
    action: &str,
    item: &T,
) {
    state
        .ws_hub
        .publish(
            event,
            &json!({ "action": action, "item": item }),
            &[Channel::Dashboard],
        )
        .await;
}
