//! Community projects and their budgets.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;
use kehila_core::error::CoreError;
use kehila_core::realtime::EVENT_PROJECT_CHANGED;
use kehila_core::types::DbId;
use kehila_db::models::project::{CreateProject, Project, UpdateProject, PROJECT_STATUSES};
use kehila_db::repositories::{page, ProjectRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::{broadcast_dashboard, record_audit, PageParams};
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::{RequireStaff, RequireViewer};
use crate::response::DataResponse;
use crate::state::AppState;

fn check_status(status: Option<&str>) -> AppResult<()> {
    match status {
        Some(s) if !PROJECT_STATUSES.contains(&s) => Err(AppError::Core(CoreError::Validation(
            format!(
                "Invalid project status '{s}'. Must be one of: {}",
                PROJECT_STATUSES.join(", ")
            ),
        ))),
        _ => Ok(()),
    }
}

fn check_dates(start: Option<chrono::NaiveDate>, end: Option<chrono::NaiveDate>) -> AppResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::Core(CoreError::Validation(
                "Project end date must not precede its start date".into(),
            )));
        }
    }
    Ok(())
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Project",
        id,
    })
}

pub async fn list_projects(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let items = ProjectRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: items }))
}

pub async fn get_project(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let item = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: item }))
}

pub async fn create_project(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateProject>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    check_status(input.status.as_deref())?;
    check_dates(input.start_date, input.end_date)?;

    let item = ProjectRepo::create(&state.pool, &input).await?;

    record_audit(
        &state,
        &staff,
        &ip,
        "project.created",
        "project",
        Some(item.id),
        json!({ "name": item.name, "budget": item.budget }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_PROJECT_CHANGED, "created", &item).await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

pub async fn update_project(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    input.validate()?;
    check_status(input.status.as_deref())?;

    let existing = ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    check_dates(
        input.start_date.or(existing.start_date),
        input.end_date.or(existing.end_date),
    )?;

    let item = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    record_audit(
        &state,
        &staff,
        &ip,
        "project.updated",
        "project",
        Some(id),
        json!({ "status": item.status, "budget": item.budget }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_PROJECT_CHANGED, "updated", &item).await;

    Ok(Json(DataResponse { data: item }))
}

pub async fn delete_project(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ProjectRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    record_audit(&state, &staff, &ip, "project.deleted", "project", Some(id), json!({})).await?;
    broadcast_dashboard(&state, EVENT_PROJECT_CHANGED, "deleted", &json!({ "id": id })).await;

    Ok(StatusCode::NO_CONTENT)
}
