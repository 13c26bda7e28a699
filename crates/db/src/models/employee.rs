//! Employee roster and attendance models.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use kehila_core::types::{DbId, Timestamp};

pub const ATTENDANCE_STATUSES: [&str; 4] = ["present", "absent", "sick", "vacation"];

/// A row from the `employees` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Employee {
    pub id: DbId,
    pub full_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployee {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEmployee {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(max = 100))]
    pub position: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// `?active=` filter for the roster.
#[derive(Debug, Default, Deserialize)]
pub struct EmployeeListParams {
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A row from the `attendance` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attendance {
    pub id: DbId,
    pub employee_id: DbId,
    pub work_date: NaiveDate,
    pub status: String,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub note: Option<String>,
    pub recorded_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Body of `POST /employees/{id}/attendance`.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAttendance {
    pub work_date: NaiveDate,
    pub status: Option<String>,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// `?from=&to=` date range, both inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
