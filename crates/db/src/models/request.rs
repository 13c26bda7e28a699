//! Request (citizen inquiry) and request update models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use kehila_core::request::Priority;
use kehila_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A row from the `requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Request {
    pub id: DbId,
    pub reference_number: String,
    pub submitter_name: String,
    pub submitter_email: String,
    pub submitter_phone: Option<String>,
    pub submitter_address: Option<String>,
    pub subject: String,
    pub description: Option<String>,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub assigned_to: Option<DbId>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// DTO for submitting a new request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRequest {
    #[validate(length(min = 1, max = 120, message = "Submitter name is required"))]
    pub submitter_name: String,
    #[validate(email(message = "A valid submitter email is required"))]
    pub submitter_email: String,
    #[validate(length(max = 40))]
    pub submitter_phone: Option<String>,
    #[validate(length(max = 300))]
    pub submitter_address: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
}

/// DTO for editing request details. Status, assignee and ownership are
/// changed through their own operations only.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRequestDetails {
    #[validate(length(min = 1, max = 120))]
    pub submitter_name: Option<String>,
    #[validate(email)]
    pub submitter_email: Option<String>,
    #[validate(length(max = 40))]
    pub submitter_phone: Option<String>,
    #[validate(length(max = 300))]
    pub submitter_address: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
}

/// Body of `PATCH /requests/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub note: Option<String>,
}

/// Body of `PATCH /requests/{id}/assign`. `null` clears the assignee.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assigned_to: Option<DbId>,
}

/// Body of `POST /requests/{id}/comment`.
#[derive(Debug, Deserialize)]
pub struct AddComment {
    pub note: String,
    #[serde(default = "default_true")]
    pub is_public: bool,
}

fn default_true() -> bool {
    true
}

/// Query parameters for listing requests.
#[derive(Debug, Default, Deserialize)]
pub struct RequestListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<DbId>,
    /// Free-text match on subject, reference number and submitter name.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Resolved filters passed to the repository.
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<DbId>,
    pub created_by: Option<DbId>,
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Request update records
// ---------------------------------------------------------------------------

/// An immutable entry in a request's history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestUpdate {
    pub id: DbId,
    pub request_id: DbId,
    pub action: String,
    pub note: Option<String>,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub actor_id: Option<DbId>,
    pub is_public: bool,
    pub created_at: Timestamp,
}

/// Insert DTO for a request update record.
#[derive(Debug, Clone)]
pub struct NewRequestUpdate<'a> {
    pub request_id: DbId,
    pub action: &'a str,
    pub note: Option<&'a str>,
    pub old_status: Option<&'a str>,
    pub new_status: Option<&'a str>,
    pub actor_id: Option<DbId>,
    pub is_public: bool,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// One `(key, count)` bucket of a grouped count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}

/// Response body of `GET /requests/stats/summary`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub total: i64,
    pub by_status: Vec<CountBucket>,
    pub by_category: Vec<CountBucket>,
    pub average_resolution_hours: Option<f64>,
}

/// Public view of a request used by the tracking endpoint: no contact
/// details, and only public updates.
#[derive(Debug, Clone, Serialize)]
pub struct PublicRequestView {
    pub reference_number: String,
    pub subject: String,
    pub category: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub updates: Vec<RequestUpdate>,
}
