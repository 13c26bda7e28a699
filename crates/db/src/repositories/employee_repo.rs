//! Repository for the `employees` table.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::types::DbId;

use crate::models::employee::{CreateEmployee, Employee, UpdateEmployee};

const COLUMNS: &str = "\
    id, full_name, position, department, phone, email, hired_on, is_active, \
    created_at, updated_at";

pub struct EmployeeRepo;

impl EmployeeRepo {
    pub async fn create(pool: &SqlitePool, input: &CreateEmployee) -> Result<Employee, sqlx::Error> {
        let query = format!(
            "INSERT INTO employees \
                (full_name, position, department, phone, email, hired_on, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(input.full_name.trim())
            .bind(&input.position)
            .bind(&input.department)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(input.hired_on)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM employees WHERE id = ?1");
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List the roster alphabetically, optionally only active or inactive
    /// employees.
    pub async fn list(
        pool: &SqlitePool,
        active: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE ?1 IS NULL OR is_active = ?1 \
             ORDER BY full_name, id LIMIT ?2 OFFSET ?3"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(active)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        input: &UpdateEmployee,
    ) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!(
            "UPDATE employees SET \
                full_name = COALESCE(?2, full_name), \
                position = COALESCE(?3, position), \
                department = COALESCE(?4, department), \
                phone = COALESCE(?5, phone), \
                email = COALESCE(?6, email), \
                hired_on = COALESCE(?7, hired_on), \
                is_active = COALESCE(?8, is_active), \
                updated_at = ?9 \
             WHERE id = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .bind(input.full_name.as_deref().map(str::trim))
            .bind(&input.position)
            .bind(&input.department)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(input.hired_on)
            .bind(input.is_active)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    /// Delete an employee together with their attendance history.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
