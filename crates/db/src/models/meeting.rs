//! Committee meeting model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use kehila_core::types::{DbId, Timestamp};

pub const MEETING_STATUSES: [&str; 3] = ["scheduled", "completed", "cancelled"];

/// A row from the `meetings` table. `protocol` holds the minutes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Meeting {
    pub id: DbId,
    pub title: String,
    pub meeting_date: Timestamp,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub protocol: Option<String>,
    pub status: String,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMeeting {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub meeting_date: Timestamp,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub protocol: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeeting {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub meeting_date: Option<Timestamp>,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub protocol: Option<String>,
    pub status: Option<String>,
}
