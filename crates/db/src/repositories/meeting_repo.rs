//! Repository for the `meetings` table.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::types::DbId;

use crate::models::meeting::{CreateMeeting, Meeting, UpdateMeeting};

const COLUMNS: &str = "\
    id, title, meeting_date, location, agenda, protocol, status, \
    created_by, created_at, updated_at";

pub struct MeetingRepo;

impl MeetingRepo {
    pub async fn create(
        pool: &SqlitePool,
        input: &CreateMeeting,
        created_by: Option<DbId>,
    ) -> Result<Meeting, sqlx::Error> {
        let query = format!(
            "INSERT INTO meetings \
                (title, meeting_date, location, agenda, protocol, status, \
                 created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, 'scheduled'), ?7, ?8, ?8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Meeting>(&query)
            .bind(&input.title)
            .bind(input.meeting_date)
            .bind(&input.location)
            .bind(&input.agenda)
            .bind(&input.protocol)
            .bind(&input.status)
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Meeting>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM meetings WHERE id = ?1");
        sqlx::query_as::<_, Meeting>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List meetings, latest date first.
    pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Meeting>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM meetings ORDER BY meeting_date DESC, id DESC LIMIT ?1 OFFSET ?2"
        );
        sqlx::query_as::<_, Meeting>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        input: &UpdateMeeting,
    ) -> Result<Option<Meeting>, sqlx::Error> {
        let query = format!(
            "UPDATE meetings SET \
                title = COALESCE(?2, title), \
                meeting_date = COALESCE(?3, meeting_date), \
                location = COALESCE(?4, location), \
                agenda = COALESCE(?5, agenda), \
                protocol = COALESCE(?6, protocol), \
                status = COALESCE(?7, status), \
                updated_at = ?8 \
             WHERE id = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Meeting>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.meeting_date)
            .bind(&input.location)
            .bind(&input.agenda)
            .bind(&input.protocol)
            .bind(&input.status)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
