//! Users, roles and sessions.

use serde::{Deserialize, Serialize};

/// Role stored on a user record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    Editor,
    Viewer,
}

/// What an admin route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Dashboard read access
    Read,
    /// Content editing: CMS and comments
    Edit,
    /// Everything else: bookings, payments, users
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn permits(&self, access: Access) -> bool {
        match self {
            Role::Admin => true,
            Role::Editor => matches!(access, Access::Read | Access::Edit),
            Role::Viewer => access == Access::Read,
            Role::Customer => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Customer
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// A persisted login session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_access_matrix() {
        for access in [Access::Read, Access::Edit, Access::Admin] {
            assert!(Role::Admin.permits(access));
            assert!(!Role::Customer.permits(access));
        }
        assert!(Role::Editor.permits(Access::Edit));
        assert!(!Role::Editor.permits(Access::Admin));
        assert!(Role::Viewer.permits(Access::Read));
        assert!(!Role::Viewer.permits(Access::Edit));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Customer, Role::Editor, Role::Viewer] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("owner"), None);
    }
}
