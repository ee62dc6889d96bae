use serde::{Deserialize, Serialize};

/// An append-only audit log entry.
///
/// Written on every privileged mutation (role/permission changes, user
/// lifecycle transitions). Entries are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Acting user id ("system" for bootstrap-time mutations).
    pub user_id: String,

    /// What happened, e.g. "role.update", "user.approve".
    pub action: String,

    /// Resource family the mutation touched.
    pub resource_type: String,

    /// Id of the touched record, when there is a single one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Arbitrary detail blob (typically before/after state).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    pub created_at: String,
}

/// Who is performing a privileged mutation, for audit attribution.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub actor_id: String,
    pub ip_address: Option<String>,
}

impl AuditContext {
    /// Attribution for bootstrap/seeding code paths.
    pub fn system() -> Self {
        Self {
            actor_id: "system".to_string(),
            ip_address: None,
        }
    }
}
