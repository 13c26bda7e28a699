//! Database snapshots (`/admin/backups`).
//!
//! Listing and on-demand snapshots only. Restoring replaces the live
//! database file and is done offline with `kehila-api restore <name>`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::background::backup::{BackupError, BackupInfo, BackupService, SnapshotKind};
use crate::error::{AppError, AppResult};
use crate::handlers::record_audit;
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of `POST /admin/backups`.
#[derive(Debug, Serialize)]
pub struct SnapshotResult {
    pub name: String,
    pub pruned: Vec<String>,
}

fn service(state: &AppState) -> AppResult<BackupService> {
    BackupService::from_config(&state.config).ok_or_else(|| {
        AppError::BadRequest("Backups are unavailable for an in-memory database".into())
    })
}

fn backup_error(err: BackupError) -> AppError {
    match err {
        BackupError::SourceMissing(_) | BackupError::InvalidName(_) | BackupError::NotFound(_) => {
            AppError::BadRequest(err.to_string())
        }
        BackupError::Checkpoint(e) => AppError::Database(e),
        BackupError::Io(e) => AppError::InternalError(format!("Backup I/O failed: {e}")),
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// GET /admin/backups -- newest first.
pub async fn list_backups(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<BackupInfo>>>> {
    let snapshots = service(&state)?.list().await.map_err(backup_error)?;
    Ok(Json(DataResponse { data: snapshots }))
}

/// POST /admin/backups -- take a manual snapshot now, then rotate.
pub async fn create_backup(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
) -> AppResult<impl IntoResponse> {
    let (created, pruned) = service(&state)?
        .run_once(&state.pool, SnapshotKind::Manual)
        .await
        .map_err(backup_error)?;

    let result = SnapshotResult {
        name: file_name(&created),
        pruned: pruned.iter().map(|p| file_name(p)).collect(),
    };
    tracing::info!(name = %result.name, pruned = result.pruned.len(), "Manual backup complete");

    record_audit(
        &state,
        &admin,
        &ip,
        "backup.created",
        "backup",
        None,
        json!({ "name": result.name }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
