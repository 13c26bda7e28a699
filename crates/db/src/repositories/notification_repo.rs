//! Repository for the `notifications` table.
//!
//! A record is created once per attempted message and completed exactly
//! once, as `sent` or `failed`.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::channels::{STATUS_FAILED, STATUS_PENDING, STATUS_SENT};
use kehila_core::types::DbId;

use crate::models::notification::{CreateNotification, Notification, NotificationListParams};
use crate::repositories::page;

const COLUMNS: &str = "\
    id, request_id, event_type, channel, recipient, subject, content, \
    status, error, created_at, completed_at";

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a `pending` record ahead of a delivery attempt.
    pub async fn create_pending(
        pool: &SqlitePool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        Self::insert(pool, input, STATUS_PENDING, None).await
    }

    /// Insert a record that is already `failed`, for messages that were never
    /// attempted (channel disabled or not configured).
    pub async fn create_failed(
        pool: &SqlitePool,
        input: &CreateNotification,
        error: &str,
    ) -> Result<Notification, sqlx::Error> {
        Self::insert(pool, input, STATUS_FAILED, Some(error)).await
    }

    async fn insert(
        pool: &SqlitePool,
        input: &CreateNotification,
        status: &str,
        error: Option<&str>,
    ) -> Result<Notification, sqlx::Error> {
        let now = Utc::now();
        let completed_at = (status != STATUS_PENDING).then_some(now);
        let query = format!(
            "INSERT INTO notifications \
                (request_id, event_type, channel, recipient, subject, content, \
                 status, error, created_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.request_id)
            .bind(&input.event_type)
            .bind(&input.channel)
            .bind(&input.recipient)
            .bind(&input.subject)
            .bind(&input.content)
            .bind(status)
            .bind(error)
            .bind(now)
            .bind(completed_at)
            .fetch_one(pool)
            .await
    }

    pub async fn mark_sent(pool: &SqlitePool, id: DbId) -> Result<(), sqlx::Error> {
        Self::complete(pool, id, STATUS_SENT, None).await
    }

    pub async fn mark_failed(pool: &SqlitePool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        Self::complete(pool, id, STATUS_FAILED, Some(error)).await
    }

    /// Move a `pending` record to its final state. A record that is no
    /// longer pending is left untouched.
    async fn complete(
        pool: &SqlitePool,
        id: DbId,
        status: &str,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET status = ?1, error = ?2, completed_at = ?3 \
             WHERE id = ?4 AND status = ?5",
        )
        .bind(status)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .bind(STATUS_PENDING)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List records newest first.
    pub async fn list(
        pool: &SqlitePool,
        params: &NotificationListParams,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if params.status.is_some() {
            conditions.push(format!("status = ?{param_idx}"));
            param_idx += 1;
        }
        if params.channel.is_some() {
            conditions.push(format!("channel = ?{param_idx}"));
            param_idx += 1;
        }
        if params.request_id.is_some() {
            conditions.push(format!("request_id = ?{param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications {where_clause} \
             ORDER BY id DESC LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, Notification>(&query);
        if let Some(status) = &params.status {
            q = q.bind(status);
        }
        if let Some(channel) = &params.channel {
            q = q.bind(channel);
        }
        if let Some(rid) = params.request_id {
            q = q.bind(rid);
        }
        let (limit, offset) = page(params.limit, params.offset);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
