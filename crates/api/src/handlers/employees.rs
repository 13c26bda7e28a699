//! Employee roster and daily attendance.
//!
//! Reads are open to viewers; changes need staff. Every change is audited
//! and broadcast on the dashboard channel.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;
use kehila_core::error::CoreError;
use kehila_core::realtime::{EVENT_ATTENDANCE_CHANGED, EVENT_EMPLOYEE_CHANGED};
use kehila_core::types::DbId;
use kehila_db::models::employee::{
    Attendance, AttendanceRange, CreateEmployee, Employee, EmployeeListParams, RecordAttendance,
    UpdateEmployee, ATTENDANCE_STATUSES,
};
use kehila_db::repositories::{page, AttendanceRepo, EmployeeRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::{broadcast_dashboard, record_audit};
use crate::middleware::auth::ClientIp;
use crate::middleware::rbac::{RequireStaff, RequireViewer};
use crate::response::DataResponse;
use crate::state::AppState;

fn validation(message: String) -> AppError {
    AppError::Core(CoreError::Validation(message))
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Employee",
        id,
    })
}

/// Status must be known; a day off carries no clock times; check-out may
/// not precede check-in.
fn check_attendance(input: &RecordAttendance) -> AppResult<()> {
    let status = input.status.as_deref().unwrap_or("present");
    if !ATTENDANCE_STATUSES.contains(&status) {
        return Err(validation(format!(
            "Invalid attendance status '{status}'. Must be one of: {}",
            ATTENDANCE_STATUSES.join(", ")
        )));
    }
    if status != "present" && (input.check_in.is_some() || input.check_out.is_some()) {
        return Err(validation(format!(
            "Check-in and check-out times only apply to 'present', not '{status}'"
        )));
    }
    if let (Some(check_in), Some(check_out)) = (input.check_in, input.check_out) {
        if check_out < check_in {
            return Err(validation("Check-out must not precede check-in".into()));
        }
    }
    Ok(())
}

async fn load_employee(state: &AppState, id: DbId) -> AppResult<Employee> {
    EmployeeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// GET /employees?active=
pub async fn list_employees(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Query(params): Query<EmployeeListParams>,
) -> AppResult<Json<DataResponse<Vec<Employee>>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let items = EmployeeRepo::list(&state.pool, params.active, limit, offset).await?;
    Ok(Json(DataResponse { data: items }))
}

pub async fn get_employee(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Employee>>> {
    let item = load_employee(&state, id).await?;
    Ok(Json(DataResponse { data: item }))
}

pub async fn create_employee(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateEmployee>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let item = EmployeeRepo::create(&state.pool, &input).await?;

    record_audit(
        &state,
        &staff,
        &ip,
        "employee.created",
        "employee",
        Some(item.id),
        json!({ "full_name": item.full_name }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_EMPLOYEE_CHANGED, "created", &item).await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

pub async fn update_employee(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEmployee>,
) -> AppResult<Json<DataResponse<Employee>>> {
    input.validate()?;

    let item = EmployeeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    record_audit(
        &state,
        &staff,
        &ip,
        "employee.updated",
        "employee",
        Some(id),
        json!({ "is_active": item.is_active, "position": item.position }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_EMPLOYEE_CHANGED, "updated", &item).await;

    Ok(Json(DataResponse { data: item }))
}

pub async fn delete_employee(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !EmployeeRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    record_audit(&state, &staff, &ip, "employee.deleted", "employee", Some(id), json!({})).await?;
    broadcast_dashboard(&state, EVENT_EMPLOYEE_CHANGED, "deleted", &json!({ "id": id })).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /employees/{id}/attendance?from=&to=
pub async fn list_attendance(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(range): Query<AttendanceRange>,
) -> AppResult<Json<DataResponse<Vec<Attendance>>>> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if to < from {
            return Err(validation("'to' must not precede 'from'".into()));
        }
    }
    load_employee(&state, id).await?;

    let records = AttendanceRepo::list_for_employee(&state.pool, id, &range).await?;
    Ok(Json(DataResponse { data: records }))
}

/// POST /employees/{id}/attendance -- record or replace one day.
pub async fn record_attendance(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<RecordAttendance>,
) -> AppResult<Json<DataResponse<Attendance>>> {
    input.validate()?;
    check_attendance(&input)?;

    let employee = load_employee(&state, id).await?;
    if !employee.is_active {
        return Err(validation(format!(
            "Employee {id} is inactive; reactivate before recording attendance"
        )));
    }

    let record = AttendanceRepo::record(&state.pool, id, &input, Some(staff.user_id)).await?;

    record_audit(
        &state,
        &staff,
        &ip,
        "attendance.recorded",
        "employee",
        Some(id),
        json!({ "work_date": record.work_date, "status": record.status }),
    )
    .await?;
    broadcast_dashboard(&state, EVENT_ATTENDANCE_CHANGED, "recorded", &record).await;

    Ok(Json(DataResponse { data: record }))
}

/// DELETE /employees/{id}/attendance/{attendance_id}
pub async fn delete_attendance(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path((id, attendance_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if !AttendanceRepo::delete(&state.pool, id, attendance_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Attendance",
            id: attendance_id,
        }));
    }

    record_audit(
        &state,
        &staff,
        &ip,
        "attendance.deleted",
        "employee",
        Some(id),
        json!({ "attendance_id": attendance_id }),
    )
    .await?;
    broadcast_dashboard(
        &state,
        EVENT_ATTENDANCE_CHANGED,
        "deleted",
        &json!({ "id": attendance_id, "employee_id": id }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
