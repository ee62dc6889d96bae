use serde::{Deserialize, Serialize};

/// A category/template of due (e.g. annual registration) with a name and
/// default amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueType {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Unique name, e.g. "Annual Registration".
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Amount used when an assignment doesn't specify one.
    pub default_amount: f64,

    /// Whether dues of this type recur yearly.
    #[serde(default)]
    pub is_recurring: bool,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a due type.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDueType {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub default_amount: f64,
    #[serde(default)]
    pub is_recurring: bool,
}
