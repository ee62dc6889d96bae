use serde::{Deserialize, Serialize};

use acpn_core::UserRole;

/// User account lifecycle state.
///
/// Accounts are created `pending` at registration; admin approval plus
/// email verification moves them to `active`. Admin action may suspend,
/// reject or deactivate. Accounts are never hard-deleted by these flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
            UserStatus::Rejected => "rejected",
        }
    }
}

/// A user identity with credentials and role assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Email address (unique, used for login).
    pub email: String,

    /// Argon2id password hash. Stripped from API responses.
    pub password_hash: String,

    /// Assigned role. Matches a Role document name.
    pub role: UserRole,

    /// Account lifecycle state.
    pub status: UserStatus,

    /// Set by admin approval. Members must be approved (in addition to
    /// being active) before they can authenticate.
    #[serde(default)]
    pub is_approved: bool,

    /// Set when the email-verification token is consumed.
    #[serde(default)]
    pub email_verified: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

impl User {
    /// Whether this account currently satisfies the authentication
    /// invariant: status must be active, and members must be approved.
    pub fn can_authenticate(&self) -> bool {
        self.status == UserStatus::Active
            && (self.role != UserRole::Member || self.is_approved)
    }

    /// JSON view with credentials stripped, for API responses.
    pub fn api_view(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = v.as_object_mut() {
            obj.remove("password_hash");
        }
        v
    }
}

/// Input for self-service registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Input for admin-created accounts (active and approved immediately).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, status: UserStatus, approved: bool) -> User {
        User {
            id: "u1".into(),
            name: "Ade".into(),
            email: "ade@example.com".into(),
            password_hash: "$argon2id$stub".into(),
            role,
            status,
            is_approved: approved,
            email_verified: true,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn member_needs_approval_to_authenticate() {
        assert!(!user(UserRole::Member, UserStatus::Active, false).can_authenticate());
        assert!(user(UserRole::Member, UserStatus::Active, true).can_authenticate());
        assert!(!user(UserRole::Member, UserStatus::Pending, true).can_authenticate());
        assert!(!user(UserRole::Member, UserStatus::Suspended, true).can_authenticate());
    }

    #[test]
    fn staff_roles_need_only_active_status() {
        assert!(user(UserRole::Admin, UserStatus::Active, false).can_authenticate());
        assert!(!user(UserRole::Admin, UserStatus::Inactive, false).can_authenticate());
    }

    #[test]
    fn api_view_strips_credentials() {
        let v = user(UserRole::Member, UserStatus::Active, true).api_view();
        assert!(v.get("password_hash").is_none());
        assert_eq!(v["email"], "ade@example.com");
    }
}
