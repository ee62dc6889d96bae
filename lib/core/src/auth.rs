//! Authentication and authorization seam.
//!
//! Business modules do not depend on the auth module directly. They only
//! know this trait; the concrete implementation (JWT verification backed
//! by the user/role/permission store) is injected at startup.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Application roles. The role name on the wire is the snake_case form
/// ("financial_secretary", "superadmin", ...), matching the default Role
/// documents seeded at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Secretary,
    Treasurer,
    FinancialSecretary,
    Admin,
    Superadmin,
}

impl UserRole {
    /// All roles, in seeding order.
    pub const ALL: [UserRole; 6] = [
        UserRole::Superadmin,
        UserRole::Admin,
        UserRole::Secretary,
        UserRole::Treasurer,
        UserRole::FinancialSecretary,
        UserRole::Member,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Secretary => "secretary",
            UserRole::Treasurer => "treasurer",
            UserRole::FinancialSecretary => "financial_secretary",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(UserRole::Member),
            "secretary" => Ok(UserRole::Secretary),
            "treasurer" => Ok(UserRole::Treasurer),
            "financial_secretary" => Ok(UserRole::FinancialSecretary),
            "admin" => Ok(UserRole::Admin),
            "superadmin" => Ok(UserRole::Superadmin),
            other => Err(ServiceError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, as resolved from request credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
}

impl Identity {
    /// Coarse role gate: plain set membership against an allowed-role list.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), ServiceError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "role '{}' is not permitted to perform this action",
                self.role
            )))
        }
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == UserRole::Superadmin
    }
}

/// Pluggable authenticator consumed by every module's API layer.
pub trait Authenticator: Send + Sync {
    /// Resolve the caller's identity from request headers.
    ///
    /// Returns `Unauthorized` for a missing/invalid/expired token and for
    /// accounts that are not allowed to authenticate (inactive, pending
    /// approval, suspended).
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, ServiceError>;

    /// Check a (resource, action) permission for an already-authenticated
    /// identity against the role/permission table.
    ///
    /// Returns `PermissionDenied` when the role lacks the permission and
    /// `NotFound` when the role document itself is missing.
    fn check_permission(
        &self,
        identity: &Identity,
        resource: &str,
        action: &str,
    ) -> Result<(), ServiceError>;
}

/// Authenticator that resolves every request to a fixed superadmin
/// identity and allows every permission. For tests.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Identity, ServiceError> {
        Ok(Identity {
            user_id: "test-superadmin".to_string(),
            name: "Test Superadmin".to_string(),
            role: UserRole::Superadmin,
        })
    }

    fn check_permission(
        &self,
        _identity: &Identity,
        _resource: &str,
        _action: &str,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Authenticator that rejects everything. For tests.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Identity, ServiceError> {
        Err(ServiceError::Unauthorized("access denied".into()))
    }

    fn check_permission(
        &self,
        _identity: &Identity,
        _resource: &str,
        _action: &str,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::PermissionDenied("access denied".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in UserRole::ALL {
            let parsed: UserRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("chairman".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serde_uses_snake_case() {
        let json = serde_json::to_string(&UserRole::FinancialSecretary).unwrap();
        assert_eq!(json, "\"financial_secretary\"");
        let back: UserRole = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(back, UserRole::Superadmin);
    }

    #[test]
    fn require_role_is_set_membership() {
        let treasurer = Identity {
            user_id: "u1".into(),
            name: "T".into(),
            role: UserRole::Treasurer,
        };
        assert!(treasurer
            .require_role(&[UserRole::Admin, UserRole::Superadmin, UserRole::Treasurer])
            .is_ok());
        assert!(treasurer
            .require_role(&[UserRole::Admin, UserRole::Superadmin])
            .is_err());
    }
}
