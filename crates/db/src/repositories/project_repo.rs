//! Repository for the `projects` table.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::types::DbId;

use crate::models::project::{CreateProject, Project, UpdateProject};

const COLUMNS: &str = "\
    id, name, description, status, budget, start_date, end_date, manager_id, \
    created_at, updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn create(pool: &SqlitePool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects \
                (name, description, status, budget, start_date, end_date, manager_id, \
                 created_at, updated_at) \
             VALUES (?1, ?2, COALESCE(?3, 'planning'), COALESCE(?4, 0), ?5, ?6, ?7, ?8, ?8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.status)
            .bind(input.budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.manager_id)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY id DESC LIMIT ?1 OFFSET ?2");
        sqlx::query_as::<_, Project>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                name = COALESCE(?2, name), \
                description = COALESCE(?3, description), \
                status = COALESCE(?4, status), \
                budget = COALESCE(?5, budget), \
                start_date = COALESCE(?6, start_date), \
                end_date = COALESCE(?7, end_date), \
                manager_id = COALESCE(?8, manager_id), \
                updated_at = ?9 \
             WHERE id = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.status)
            .bind(input.budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.manager_id)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
