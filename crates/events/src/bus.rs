//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries [`LifecycleEvent`]s from the request lifecycle to
//! background consumers. It is shared via `Arc<EventBus>` in the API state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use kehila_core::types::DbId;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const REQUEST_CREATED: &str = "request.created";
pub const REQUEST_STATUS_CHANGED: &str = "request.status_changed";
pub const REQUEST_ASSIGNED: &str = "request.assigned";
pub const REQUEST_COMMENT: &str = "request.comment";

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Something that happened to a request, published after the write that
/// caused it has committed.
///
/// `payload` carries event-specific fields:
///
/// | Event                    | Payload keys                           |
/// |--------------------------|----------------------------------------|
/// | `request.created`        | none                                   |
/// | `request.status_changed` | `old_status`, `new_status`, `note`     |
/// | `request.assigned`       | `assigned_to`, `assignee_name`         |
/// | `request.comment`        | `note`, `is_public`                    |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Dot-separated event name, e.g. `"request.status_changed"`.
    pub event_type: String,

    pub request_id: DbId,

    /// The user that triggered the event; `None` for public submissions.
    pub actor_user_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(event_type: impl Into<String>, request_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            request_id,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// String field from the payload, if present and non-empty.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(serde_json::Value::as_bool)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Never blocks; with no
    /// subscribers the event is dropped.
    pub fn publish(&self, event: LifecycleEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Lifecycle event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
