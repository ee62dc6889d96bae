use serde::{Deserialize, Serialize};

/// Document visibility tier, independent of the role/permission system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Public,
    Members,
    Committee,
    Executives,
    Admin,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 5] = [
        AccessLevel::Public,
        AccessLevel::Members,
        AccessLevel::Committee,
        AccessLevel::Executives,
        AccessLevel::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Members => "members",
            AccessLevel::Committee => "committee",
            AccessLevel::Executives => "executives",
            AccessLevel::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Policy,
    Minutes,
    Report,
    Form,
    Newsletter,
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Policy => "policy",
            DocumentCategory::Minutes => "minutes",
            DocumentCategory::Report => "report",
            DocumentCategory::Form => "form",
            DocumentCategory::Newsletter => "newsletter",
            DocumentCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Active,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Archived => "archived",
        }
    }
}

/// An organization document. `version` always equals the highest version
/// number among its [`DocumentVersion`] records (0 while no file has been
/// uploaded yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDocument {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Blob-store key of the current version's content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub file_size: u64,

    pub category: DocumentCategory,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub access_level: AccessLevel,

    pub status: DocumentStatus,

    /// Current version counter; bumped on each upload.
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub view_count: u64,

    #[serde(default)]
    pub download_count: u64,

    pub uploaded_by: String,
    pub uploaded_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

/// An immutable record of one uploaded version of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    pub document_id: String,

    pub version: u32,

    pub file_key: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: u64,

    pub uploaded_by: String,
    pub uploaded_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_note: Option<String>,
}

/// Input for creating a document's metadata shell.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: DocumentCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub expiration_date: Option<String>,
}
