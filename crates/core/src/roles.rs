//! User roles and their partial order.
//!
//! Role is the only authorization axis: there are no per-resource ACLs.
//! The order is `super_admin ⊇ admin ⊇ staff ⊇ citizen`; `editor` ranks
//! alongside `staff` and `viewer` sits between `staff` and `citizen`
//! (read-only access to the dashboard).
//!
//! The string values must match the `CHECK` constraint on `users.role`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";
pub const ROLE_CITIZEN: &str = "citizen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Staff,
    Editor,
    Viewer,
    Citizen,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Staff,
        Role::Editor,
        Role::Viewer,
        Role::Citizen,
    ];

    /// Parse a stored or user-supplied role name.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            ROLE_SUPER_ADMIN => Ok(Role::SuperAdmin),
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_STAFF => Ok(Role::Staff),
            ROLE_EDITOR => Ok(Role::Editor),
            ROLE_VIEWER => Ok(Role::Viewer),
            ROLE_CITIZEN => Ok(Role::Citizen),
            other => Err(CoreError::Validation(format!(
                "Unknown role '{other}'. Must be one of: {}",
                Role::ALL.map(Role::as_str).join(", ")
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
            Role::Admin => ROLE_ADMIN,
            Role::Staff => ROLE_STAFF,
            Role::Editor => ROLE_EDITOR,
            Role::Viewer => ROLE_VIEWER,
            Role::Citizen => ROLE_CITIZEN,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 50,
            Role::Admin => 40,
            Role::Staff | Role::Editor => 30,
            Role::Viewer => 20,
            Role::Citizen => 10,
        }
    }

    /// Whether this role grants at least the permissions of `other`.
    pub fn includes(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    /// Super admins and admins.
    pub fn is_admin(self) -> bool {
        self.includes(Role::Admin)
    }

    /// Staff, editors and everything above them may mutate requests.
    pub fn can_manage_requests(self) -> bool {
        self.includes(Role::Staff)
    }

    /// Viewers and above may read the dashboard (all requests, statistics,
    /// budget, meetings, projects).
    pub fn can_view_dashboard(self) -> bool {
        self.includes(Role::Viewer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::parse("root").is_err());
        assert!(Role::parse("").is_err());
    }

    #[test]
    fn chain_super_admin_admin_staff_citizen() {
        assert!(Role::SuperAdmin.includes(Role::Admin));
        assert!(Role::Admin.includes(Role::Staff));
        assert!(Role::Staff.includes(Role::Citizen));
        assert!(!Role::Citizen.includes(Role::Staff));
        assert!(!Role::Staff.includes(Role::Admin));
        assert!(!Role::Admin.includes(Role::SuperAdmin));
    }

    #[test]
    fn editor_manages_requests_but_viewer_does_not() {
        assert!(Role::Editor.can_manage_requests());
        assert!(!Role::Viewer.can_manage_requests());
        assert!(Role::Viewer.can_view_dashboard());
        assert!(!Role::Citizen.can_view_dashboard());
    }

    #[test]
    fn only_admins_are_admin() {
        assert!(Role::SuperAdmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Staff.is_admin());
        assert!(!Role::Editor.is_admin());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
    }
}
