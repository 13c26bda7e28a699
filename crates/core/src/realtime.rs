//! Real-time broadcast channels and event names.
//!
//! A WebSocket session subscribes to named channels; every broadcast is
//! addressed to a set of channels and reaches each session subscribed to at
//! least one of them. Subscription rules live here so the socket handler and
//! tests share one definition.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const EVENT_REQUEST_CREATED: &str = "request:created";
pub const EVENT_REQUEST_UPDATED: &str = "request:updated";
pub const EVENT_REQUEST_COMMENT: &str = "request:comment";
pub const EVENT_REQUEST_DELETED: &str = "request:deleted";

pub const EVENT_TRANSACTION_CHANGED: &str = "transaction:changed";
pub const EVENT_MEETING_CHANGED: &str = "meeting:changed";
pub const EVENT_PROJECT_CHANGED: &str = "project:changed";
pub const EVENT_EMPLOYEE_CHANGED: &str = "employee:changed";
pub const EVENT_ATTENDANCE_CHANGED: &str = "attendance:changed";

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Every request change. Staff and above.
    Requests,
    /// Changes to requests owned by one user.
    User(DbId),
    /// Changes to a single request.
    Request(DbId),
    /// Budget, meeting and project changes. Viewers and above.
    Dashboard,
}

impl Channel {
    /// The channels a request change is addressed to.
    pub fn for_request(request_id: DbId, owner_id: Option<DbId>) -> Vec<Channel> {
        let mut scopes = vec![Channel::Requests, Channel::Request(request_id)];
        if let Some(owner) = owner_id {
            scopes.push(Channel::User(owner));
        }
        scopes
    }

    /// Decide whether a session may subscribe to this channel.
    ///
    /// `owns_request` is only consulted for [`Channel::Request`] and must say
    /// whether the session's user created that request.
    pub fn authorize(
        self,
        session: Option<(DbId, Role)>,
        owns_request: bool,
    ) -> Result<(), CoreError> {
        let Some((user_id, role)) = session else {
            return Err(CoreError::Unauthorized(
                "Authentication required to subscribe".into(),
            ));
        };
        let allowed = match self {
            Channel::Requests => role.can_manage_requests(),
            Channel::Dashboard => role.can_view_dashboard(),
            Channel::User(id) => id == user_id || role.is_admin(),
            Channel::Request(_) => role.can_view_dashboard() || owns_request,
        };
        if allowed {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{role}' may not subscribe to '{self}'"
            )))
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Requests => f.write_str("requests"),
            Channel::Dashboard => f.write_str("dashboard"),
            Channel::User(id) => write!(f, "user:{id}"),
            Channel::Request(id) => write!(f, "request:{id}"),
        }
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("Unknown channel '{value}'"));
        match value {
            "requests" => Ok(Channel::Requests),
            "dashboard" => Ok(Channel::Dashboard),
            _ => {
                let (kind, id) = value.split_once(':').ok_or_else(invalid)?;
                let id: DbId = id.parse().map_err(|_| invalid())?;
                match kind {
                    "user" => Ok(Channel::User(id)),
                    "request" => Ok(Channel::Request(id)),
                    _ => Err(invalid()),
                }
            }
        }
    }
}
