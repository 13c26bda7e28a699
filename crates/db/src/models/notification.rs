//! Outbound notification records.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use kehila_core::types::{DbId, Timestamp};

/// One attempted outbound message.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub request_id: Option<DbId>,
    pub event_type: String,
    pub channel: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
    pub status: String,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Insert DTO for a notification record.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub request_id: Option<DbId>,
    pub event_type: String,
    pub channel: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
}

/// Query parameters for listing notification records.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationListParams {
    pub status: Option<String>,
    pub channel: Option<String>,
    pub request_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
