use serde::{Deserialize, Serialize};

/// Ledger entry direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Income,
    Expense,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Income => "income",
            RecordType::Expense => "expense",
        }
    }
}

/// Closed category set for ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Dues,
    Donation,
    EventFees,
    RegistrationFees,
    Grants,
    Investments,
    Administrative,
    Utilities,
    Rent,
    Salaries,
    Events,
    Projects,
    Miscellaneous,
}

impl RecordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordCategory::Dues => "dues",
            RecordCategory::Donation => "donation",
            RecordCategory::EventFees => "event_fees",
            RecordCategory::RegistrationFees => "registration_fees",
            RecordCategory::Grants => "grants",
            RecordCategory::Investments => "investments",
            RecordCategory::Administrative => "administrative",
            RecordCategory::Utilities => "utilities",
            RecordCategory::Rent => "rent",
            RecordCategory::Salaries => "salaries",
            RecordCategory::Events => "events",
            RecordCategory::Projects => "projects",
            RecordCategory::Miscellaneous => "miscellaneous",
        }
    }
}

/// Review state of a ledger entry. Entries recorded by finance staff are
/// authoritative and default to approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
        }
    }
}

/// An income or expense ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    #[serde(rename = "type")]
    pub record_type: RecordType,

    pub category: RecordCategory,

    /// Strictly positive.
    pub amount: f64,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Transaction date, `YYYY-MM-DD`.
    pub date: String,

    pub recorded_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    pub status: RecordStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub category: RecordCategory,
    pub amount: f64,
    /// Defaults to `description` when absent.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub attachments: Vec<String>,
}
