//! Budget ledger: income and expense entries.
//!
//! Viewers and above may read; staff and above may write. Every change is
//! broadcast on the `dashboard` channel.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;
use kehila_core::error::CoreError;
use kehila_core::realtime::EVENT_TRANSACTION_CHANGED;
use kehila_core::types::DbId;
use kehila_db::models::transaction::{
    is_valid_kind, CreateTransaction, Transaction, TransactionListParams, TransactionSummary,
    UpdateTransaction,
};
use kehila_db::repositories::TransactionRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::{broadcast_dashboard, record_audit};
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::{RequireStaff, RequireViewer};
use crate::response::DataResponse;
use crate::state::AppState;

fn check_kind(kind: &str) -> AppResult<()> {
    if is_valid_kind(kind) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Invalid transaction kind '{kind}'. Must be 'income' or 'expense'"
        ))))
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Transaction",
        id,
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /transactions -- filter by `kind`, `from`, `to`, `project_id`.
pub async fn list_transactions(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> AppResult<Json<DataResponse<Vec<Transaction>>>> {
    if let Some(kind) = params.kind.as_deref() {
        check_kind(kind)?;
    }
    let items = TransactionRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /transactions/summary -- income, expense and balance over the same
/// filters as the list.
pub async fn summary(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> AppResult<Json<DataResponse<TransactionSummary>>> {
    let totals = TransactionRepo::summary(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: totals }))
}

pub async fn get_transaction(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Transaction>>> {
    let item = TransactionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: item }))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

pub async fn create_transaction(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateTransaction>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_kind(&input.kind)?;

    let item = TransactionRepo::create(&state.pool, &input, Some(staff.user_id)).await?;

    record_audit(
        &state,
        &staff,
        &ip,
        "transaction.created",
        "transaction",
        Some(item.id),
        json!({ "kind": item.kind, "amount": item.amount }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_TRANSACTION_CHANGED, "created", &item).await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

pub async fn update_transaction(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTransaction>,
) -> AppResult<Json<DataResponse<Transaction>>> {
    input.validate()?;
    if let Some(kind) = input.kind.as_deref() {
        check_kind(kind)?;
    }

    let item = TransactionRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    record_audit(
        &state,
        &staff,
        &ip,
        "transaction.updated",
        "transaction",
        Some(id),
        json!({ "kind": item.kind, "amount": item.amount }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_TRANSACTION_CHANGED, "updated", &item).await;

    Ok(Json(DataResponse { data: item }))
}

pub async fn delete_transaction(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !TransactionRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    record_audit(&state, &staff, &ip, "transaction.deleted", "transaction", Some(id), json!({}))
        .await?;
    broadcast_dashboard(&state, EVENT_TRANSACTION_CHANGED, "deleted", &json!({ "id": id }))
        .await;

    Ok(StatusCode::NO_CONTENT)
}
