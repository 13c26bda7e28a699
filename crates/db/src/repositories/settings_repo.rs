//! Repository for the `settings` key/value table.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::setting::Setting;

pub struct SettingsRepo;

impl SettingsRepo {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Setting>, sqlx::Error> {
        sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings ORDER BY key")
            .fetch_all(pool)
            .await
    }

    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Read a boolean flag. A missing row yields `default`; any value other
    /// than `true`/`1`/`yes`/`on` (case-insensitive) is false.
    pub async fn get_flag(pool: &SqlitePool, key: &str, default: bool) -> Result<bool, sqlx::Error> {
        Ok(Self::get(pool, key)
            .await?
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(default))
    }

    pub async fn upsert(pool: &SqlitePool, key: &str, value: &str) -> Result<Setting, sqlx::Error> {
        sqlx::query_as::<_, Setting>(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }
}
