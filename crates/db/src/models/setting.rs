//! Key/value runtime settings.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use kehila_core::types::Timestamp;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: Timestamp,
}

/// Body of `PUT /admin/settings/{key}`.
#[derive(Debug, Deserialize)]
pub struct UpsertSetting {
    pub value: String,
}
