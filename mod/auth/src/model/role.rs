use serde::{Deserialize, Serialize};

/// A named bundle of permissions assignable to users.
///
/// The six default roles (one per `UserRole` value) are seeded by
/// initialization. `is_default` protects them from rename, delete and
/// deactivation; initialization resets their permission sets to the
/// curated definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Unique role name. Default roles use the `UserRole` wire name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered Permission ids this role grants.
    #[serde(default)]
    pub permission_ids: Vec<String>,

    /// Whether this is a seeded default role.
    #[serde(default)]
    pub is_default: bool,

    /// Inactive roles grant nothing.
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

/// Input for creating a custom role.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<String>,
}
