use serde::{Deserialize, Serialize};

use acpn_core::ServiceError;

/// Protected resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    User,
    Pharmacy,
    FinancialRecord,
    Event,
    Document,
    Communication,
    Election,
    Poll,
    Donation,
    Due,
    Role,
    Permission,
    AuditTrail,
}

impl Resource {
    pub const ALL: [Resource; 13] = [
        Resource::User,
        Resource::Pharmacy,
        Resource::FinancialRecord,
        Resource::Event,
        Resource::Document,
        Resource::Communication,
        Resource::Election,
        Resource::Poll,
        Resource::Donation,
        Resource::Due,
        Resource::Role,
        Resource::Permission,
        Resource::AuditTrail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Pharmacy => "pharmacy",
            Resource::FinancialRecord => "financial_record",
            Resource::Event => "event",
            Resource::Document => "document",
            Resource::Communication => "communication",
            Resource::Election => "election",
            Resource::Poll => "poll",
            Resource::Donation => "donation",
            Resource::Due => "due",
            Resource::Role => "role",
            Resource::Permission => "permission",
            Resource::AuditTrail => "audit_trail",
        }
    }
}

impl std::str::FromStr for Resource {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ServiceError::Validation(format!("unknown resource '{}'", s)))
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a permission can grant on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Approve,
    Reject,
    Assign,
    Manage,
    Export,
    Import,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Approve,
        Action::Reject,
        Action::Assign,
        Action::Manage,
        Action::Export,
        Action::Import,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Assign => "assign",
            Action::Manage => "manage",
            Action::Export => "export",
            Action::Import => "import",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ServiceError::Validation(format!("unknown action '{}'", s)))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic (resource, action) capability grant.
///
/// No two permissions share the same (resource, action) pair — the store
/// enforces this with a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Short name, conventionally `<resource>:<action>`.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub resource: Resource,
    pub action: Action,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a permission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub resource: Resource,
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_round_trip() {
        for r in Resource::ALL {
            assert_eq!(r.as_str().parse::<Resource>().unwrap(), r);
        }
        assert!("spaceship".parse::<Resource>().is_err());
    }

    #[test]
    fn action_round_trip() {
        for a in Action::ALL {
            assert_eq!(a.as_str().parse::<Action>().unwrap(), a);
        }
        assert!("teleport".parse::<Action>().is_err());
    }

    #[test]
    fn serde_matches_wire_names() {
        assert_eq!(
            serde_json::to_string(&Resource::FinancialRecord).unwrap(),
            "\"financial_record\""
        );
        assert_eq!(serde_json::to_string(&Action::Approve).unwrap(), "\"approve\"");
    }
}
