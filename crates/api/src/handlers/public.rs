//! Unauthenticated endpoints for residents: submit a request and track it by
//! reference number.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use kehila_core::reference::ReferenceNumber;
use kehila_core::types::Timestamp;
use kehila_db::models::request::{CreateRequest, PublicRequestView};
use kehila_db::repositories::{RequestRepo, RequestUpdateRepo};

use crate::error::{AppError, AppResult};
use crate::lifecycle::{Actor, RequestLifecycle};
use crate::middleware::auth::ClientIp;
use crate::response::DataResponse;
use crate::state::AppState;

/// What an anonymous submitter gets back: enough to track the request.
#[derive(Debug, Serialize)]
pub struct SubmissionReceipt {
    pub reference_number: String,
    pub status: String,
    pub created_at: Timestamp,
}

/// POST /api/v1/public/requests
pub async fn submit_request(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateRequest>,
) -> AppResult<impl IntoResponse> {
    let request = RequestLifecycle::from_state(&state)
        .create_request(&input, &Actor::anonymous(ip))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmissionReceipt {
                reference_number: request.reference_number,
                status: request.status,
                created_at: request.created_at,
            },
        }),
    ))
}

/// GET /api/v1/public/requests/{reference_number}
///
/// Status and public updates only; contact details are never exposed.
pub async fn track_request(
    State(state): State<AppState>,
    Path(reference_number): Path<String>,
) -> AppResult<Json<DataResponse<PublicRequestView>>> {
    ReferenceNumber::parse(&reference_number)?;

    let request = RequestRepo::find_by_reference(&state.pool, &reference_number)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
    let updates = RequestUpdateRepo::list_for_request(&state.pool, request.id, true).await?;

    Ok(Json(DataResponse {
        data: PublicRequestView {
            reference_number: request.reference_number,
            subject: request.subject,
            category: request.category,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
            resolved_at: request.resolved_at,
            updates,
        },
    }))
}
