//! Repository for the `attendance` table.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::types::DbId;

use crate::models::employee::{Attendance, AttendanceRange, RecordAttendance};

const COLUMNS: &str = "\
    id, employee_id, work_date, status, check_in, check_out, note, recorded_by, \
    created_at, updated_at";

pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Record one day for an employee. A second record for the same day
    /// replaces the first.
    pub async fn record(
        pool: &SqlitePool,
        employee_id: DbId,
        input: &RecordAttendance,
        recorded_by: Option<DbId>,
    ) -> Result<Attendance, sqlx::Error> {
        let query = format!(
            "INSERT INTO attendance \
                (employee_id, work_date, status, check_in, check_out, note, recorded_by, \
                 created_at, updated_at) \
             VALUES (?1, ?2, COALESCE(?3, 'present'), ?4, ?5, ?6, ?7, ?8, ?8) \
             ON CONFLICT (employee_id, work_date) DO UPDATE SET \
                status = excluded.status, \
                check_in = excluded.check_in, \
                check_out = excluded.check_out, \
                note = excluded.note, \
                recorded_by = excluded.recorded_by, \
                updated_at = excluded.updated_at \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(employee_id)
            .bind(input.work_date)
            .bind(&input.status)
            .bind(input.check_in)
            .bind(input.check_out)
            .bind(&input.note)
            .bind(recorded_by)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Attendance for one employee within `range`, oldest day first.
    pub async fn list_for_employee(
        pool: &SqlitePool,
        employee_id: DbId,
        range: &AttendanceRange,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance \
             WHERE employee_id = ?1 \
               AND (?2 IS NULL OR work_date >= ?2) \
               AND (?3 IS NULL OR work_date <= ?3) \
             ORDER BY work_date"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(employee_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool)
            .await
    }

    /// Delete one record, scoped to its employee.
    pub async fn delete(pool: &SqlitePool, employee_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?1 AND employee_id = ?2")
            .bind(id)
            .bind(employee_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
