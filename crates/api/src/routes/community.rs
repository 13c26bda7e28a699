//! Route definitions for the community dashboard: budget, meetings,
//! projects and staff.

use axum::routing::get;
use axum::Router;

use crate::handlers::{employees, meetings, projects, transactions};
use crate::state::AppState;

/// Routes mounted at `/transactions`.
///
/// ```text
/// GET, POST          /            -> list_transactions, create_transaction
/// GET                /summary     -> summary
/// GET, PUT, DELETE   /{id}        -> get, update, delete
/// ```
pub fn transactions_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/summary", get(transactions::summary))
        .route(
            "/{id}",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
}

/// Routes mounted at `/meetings`.
///
/// ```text
/// GET, POST          /            -> list_meetings, create_meeting
/// GET, PUT, DELETE   /{id}        -> get, update, delete
/// ```
pub fn meetings_router() -> Router<AppState> {
    Router::new()
        .route("/", get(meetings::list_meetings).post(meetings::create_meeting))
        .route(
            "/{id}",
            get(meetings::get_meeting)
                .put(meetings::update_meeting)
                .delete(meetings::delete_meeting),
        )
}

/// Routes mounted at `/projects`.
///
/// ```text
/// GET, POST          /            -> list_projects, create_project
/// GET, PUT, DELETE   /{id}        -> get, update, delete
/// ```
pub fn projects_router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
}

/// Routes mounted at `/employees`.
///
/// ```text
/// GET, POST          /                               -> list_employees, create_employee
/// GET, PUT, DELETE   /{id}                           -> get, update, delete
/// GET, POST          /{id}/attendance                -> list_attendance, record_attendance
/// DELETE             /{id}/attendance/{attendance_id} -> delete_attendance
/// ```
pub fn employees_router() -> Router<AppState> {
    Router::new()
        .route("/", get(employees::list_employees).post(employees::create_employee))
        .route(
            "/{id}",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route(
            "/{id}/attendance",
            get(employees::list_attendance).post(employees::record_attendance),
        )
        .route(
            "/{id}/attendance/{attendance_id}",
            axum::routing::delete(employees::delete_attendance),
        )
}
