//! Committee meetings with agenda and protocol.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;
use kehila_core::error::CoreError;
use kehila_core::realtime::EVENT_MEETING_CHANGED;
use kehila_core::types::DbId;
use kehila_db::models::meeting::{CreateMeeting, Meeting, UpdateMeeting, MEETING_STATUSES};
use kehila_db::repositories::{page, MeetingRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::{broadcast_dashboard, record_audit, PageParams};
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::{RequireStaff, RequireViewer};
use crate::response::DataResponse;
use crate::state::AppState;

fn check_status(status: Option<&str>) -> AppResult<()> {
    match status {
        Some(s) if !MEETING_STATUSES.contains(&s) => Err(AppError::Core(CoreError::Validation(
            format!(
                "Invalid meeting status '{s}'. Must be one of: {}",
                MEETING_STATUSES.join(", ")
            ),
        ))),
        _ => Ok(()),
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Meeting",
        id,
    })
}

/// GET /meetings -- newest meeting date first.
pub async fn list_meetings(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Vec<Meeting>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let items = MeetingRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: items }))
}

pub async fn get_meeting(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Meeting>>> {
    let item = MeetingRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: item }))
}

pub async fn create_meeting(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateMeeting>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_status(input.status.as_deref())?;

    let item = MeetingRepo::create(&state.pool, &input, Some(staff.user_id)).await?;

    record_audit(
        &state,
        &staff,
        &ip,
        "meeting.created",
        "meeting",
        Some(item.id),
        json!({ "title": item.title }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_MEETING_CHANGED, "created", &item).await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

pub async fn update_meeting(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMeeting>,
) -> AppResult<Json<DataResponse<Meeting>>> {
    input.validate()?;
    check_status(input.status.as_deref())?;

    let item = MeetingRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    record_audit(
        &state,
        &staff,
        &ip,
        "meeting.updated",
        "meeting",
        Some(id),
        json!({ "status": item.status }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_MEETING_CHANGED, "updated", &item).await;

    Ok(Json(DataResponse { data: item }))
}

pub async fn delete_meeting(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !MeetingRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    record_audit(&state, &staff, &ip, "meeting.deleted", "meeting", Some(id), json!({})).await?;
    broadcast_dashboard(&state, EVENT_MEETING_CHANGED, "deleted", &json!({ "id": id })).await;

    Ok(StatusCode::NO_CONTENT)
}
