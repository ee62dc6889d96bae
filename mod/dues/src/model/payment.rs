use serde::{Deserialize, Serialize};

/// Review state of a submitted payment. Transitions exactly once out of
/// `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// A pharmacy's submitted payment against a due, subject to review.
///
/// Approval applies the amount to the due and recomputes its balance;
/// rejection leaves the due untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuePayment {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    pub due_id: String,
    pub pharmacy_id: String,

    pub amount: f64,

    pub payment_method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,

    pub approval_status: ApprovalStatus,

    pub submitted_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Input for submitting a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPayment {
    pub due_id: String,
    pub amount: f64,
    pub payment_method: String,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}
