use serde::{Deserialize, Serialize};

/// Pharmacy registration state. Only `active` pharmacies are targeted by
/// bulk due assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Pending,
    Expired,
    Suspended,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "active",
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Expired => "expired",
            RegistrationStatus::Suspended => "suspended",
        }
    }
}

/// A member pharmacy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pharmacy {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Business name.
    pub name: String,

    /// Registration number issued by the association (unique).
    pub registration_number: String,

    pub registration_status: RegistrationStatus,

    /// Owning user account. Grants read access to the pharmacy's dues.
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for registering a pharmacy.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePharmacy {
    pub name: String,
    pub registration_number: String,
    pub user_id: String,
    #[serde(default)]
    pub registration_status: Option<RegistrationStatus>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}
