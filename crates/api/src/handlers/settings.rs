//! Runtime settings (`/admin/settings`).
//!
//! Channel toggles live here as `notifications.<channel>.enabled`; the
//! dispatcher reads them before every send, so a change takes effect
//! without a restart.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;
use kehila_core::error::CoreError;
use kehila_db::models::setting::{Setting, UpsertSetting};
use kehila_db::repositories::SettingsRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::record_audit;
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_KEY_LENGTH: usize = 100;

/// Reject malformed keys and non-boolean values for `*.enabled` flags.
fn validate_setting(key: &str, value: &str) -> Result<(), CoreError> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(CoreError::Validation(format!(
            "Setting key must be 1-{MAX_KEY_LENGTH} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(CoreError::Validation(format!("Invalid setting key '{key}'")));
    }
    if key.ends_with(".enabled") && value != "true" && value != "false" {
        return Err(CoreError::Validation(format!(
            "Setting '{key}' must be 'true' or 'false'"
        )));
    }
    Ok(())
}

/// GET /admin/settings
pub async fn list_settings(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Setting>>>> {
    let settings = SettingsRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /admin/settings/{key}
pub async fn upsert_setting(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(key): Path<String>,
    Json(input): Json<UpsertSetting>,
) -> AppResult<Json<DataResponse<Setting>>> {
    let value = input.value.trim();
    validate_setting(&key, value).map_err(AppError::Core)?;

    let setting = SettingsRepo::upsert(&state.pool, &key, value).await?;

    record_audit(
        &state,
        &admin,
        &ip,
        "setting.updated",
        "setting",
        None,
        json!({ "key": setting.key, "value": setting.value }),
    )
    .await?;

    Ok(Json(DataResponse { data: setting }))
}
