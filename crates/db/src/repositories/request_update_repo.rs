//! Repository for the append-only `request_updates` table.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use kehila_core::types::DbId;

use crate::models::request::{NewRequestUpdate, RequestUpdate};

const COLUMNS: &str =
    "id, request_id, action, note, old_status, new_status, actor_id, is_public, created_at";

/// Insert and read request history. There is no update or delete.
pub struct RequestUpdateRepo;

impl RequestUpdateRepo {
    pub async fn create<'e, E: SqliteExecutor<'e>>(
        executor: E,
        input: &NewRequestUpdate<'_>,
    ) -> Result<RequestUpdate, sqlx::Error> {
        let query = format!(
            "INSERT INTO request_updates \
                (request_id, action, note, old_status, new_status, actor_id, is_public, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RequestUpdate>(&query)
            .bind(input.request_id)
            .bind(input.action)
            .bind(input.note)
            .bind(input.old_status)
            .bind(input.new_status)
            .bind(input.actor_id)
            .bind(input.is_public)
            .bind(Utc::now())
            .fetch_one(executor)
            .await
    }

    /// History of one request in insertion order. With `public_only`,
    /// internal records (assignments, staff notes) are omitted.
    pub async fn list_for_request(
        pool: &SqlitePool,
        request_id: DbId,
        public_only: bool,
    ) -> Result<Vec<RequestUpdate>, sqlx::Error> {
        let filter = if public_only { "AND is_public = 1" } else { "" };
        let query = format!(
            "SELECT {COLUMNS} FROM request_updates \
             WHERE request_id = ?1 {filter} \
             ORDER BY id"
        );
        sqlx::query_as::<_, RequestUpdate>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_request(pool: &SqlitePool, request_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM request_updates WHERE request_id = ?1")
            .bind(request_id)
            .fetch_one(pool)
            .await
    }
}
