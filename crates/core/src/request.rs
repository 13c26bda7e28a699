//! Request (citizen inquiry) status machine, priorities and update actions.
//!
//! Defines the canonical status enum, the transition table, and validation
//! helpers used by the lifecycle engine and the repository layer. The two
//! historical spellings of the in-progress state (`in_progress` and
//! `in-progress`) both parse to [`RequestStatus::InProgress`]; only the
//! underscore form is ever written.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

pub const STATUS_NEW: &str = "new";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_CLOSED: &str = "closed";

/// Spelling used by the older inquiries screens.
const LEGACY_STATUS_IN_PROGRESS: &str = "in-progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    #[serde(alias = "in-progress")]
    InProgress,
    Pending,
    Resolved,
    Closed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::New,
        RequestStatus::InProgress,
        RequestStatus::Pending,
        RequestStatus::Resolved,
        RequestStatus::Closed,
    ];

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            STATUS_NEW => Ok(RequestStatus::New),
            STATUS_IN_PROGRESS | LEGACY_STATUS_IN_PROGRESS => Ok(RequestStatus::InProgress),
            STATUS_PENDING => Ok(RequestStatus::Pending),
            STATUS_RESOLVED => Ok(RequestStatus::Resolved),
            STATUS_CLOSED => Ok(RequestStatus::Closed),
            other => Err(CoreError::Validation(format!(
                "Invalid request status '{other}'. Must be one of: {}",
                RequestStatus::ALL.map(RequestStatus::as_str).join(", ")
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::New => STATUS_NEW,
            RequestStatus::InProgress => STATUS_IN_PROGRESS,
            RequestStatus::Pending => STATUS_PENDING,
            RequestStatus::Resolved => STATUS_RESOLVED,
            RequestStatus::Closed => STATUS_CLOSED,
        }
    }

    /// Hebrew label shown to residents in notification messages.
    pub fn label_he(self) -> &'static str {
        match self {
            RequestStatus::New => "חדשה",
            RequestStatus::InProgress => "בטיפול",
            RequestStatus::Pending => "ממתינה",
            RequestStatus::Resolved => "טופלה",
            RequestStatus::Closed => "סגורה",
        }
    }

    /// Statuses reachable from `self` in one step, excluding `self`.
    ///
    /// - `new`         -> `in_progress`, `pending`, `closed`
    /// - `in_progress` -> `pending`, `resolved`, `closed`
    /// - `pending`     -> `in_progress`, `resolved`, `closed`
    /// - `resolved`    -> `closed`, `in_progress` (re-open)
    /// - `closed`      -> `in_progress` (re-open)
    pub fn allowed_transitions(self) -> &'static [RequestStatus] {
        use RequestStatus::*;
        match self {
            New => &[InProgress, Pending, Closed],
            InProgress => &[Pending, Resolved, Closed],
            Pending => &[InProgress, Resolved, Closed],
            Resolved => &[Closed, InProgress],
            Closed => &[InProgress],
        }
    }

    /// Self-transitions are always permitted.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == next || self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a status transition from `current` to `next` is allowed.
pub fn validate_transition(current: RequestStatus, next: RequestStatus) -> Result<(), CoreError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: current.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid priority '{value}'. Must be one of: {}",
                    Priority::ALL.map(Priority::as_str).join(", ")
                ))
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Update record actions
// ---------------------------------------------------------------------------

pub const ACTION_CREATED: &str = "CREATED";
pub const ACTION_STATUS_CHANGED: &str = "STATUS_CHANGED";
/// A note attached to a status update that did not change the status.
pub const ACTION_NOTE: &str = "NOTE";
pub const ACTION_ASSIGNED: &str = "ASSIGNED";
pub const ACTION_COMMENT: &str = "COMMENT";

/// Which update-record action a status update produces, if any.
///
/// A record is written when the status actually changes or a non-empty note
/// is supplied; a bare self-transition writes nothing.
pub fn status_update_action(
    current: RequestStatus,
    next: RequestStatus,
    note: Option<&str>,
) -> Option<&'static str> {
    let has_note = note.is_some_and(|n| !n.trim().is_empty());
    if current != next {
        Some(ACTION_STATUS_CHANGED)
    } else if has_note {
        Some(ACTION_NOTE)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Field limits
// ---------------------------------------------------------------------------

pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_NOTE_LENGTH: usize = 5_000;

/// Validate a comment or status note.
pub fn validate_note(note: &str) -> Result<(), CoreError> {
    if note.trim().is_empty() {
        return Err(CoreError::Validation("Note must not be empty".into()));
    }
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Note exceeds maximum length of {MAX_NOTE_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
