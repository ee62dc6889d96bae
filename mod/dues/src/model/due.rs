use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Derived payment state of a due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    PartiallyPaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::PartiallyPaid => "partially_paid",
        }
    }
}

/// An additive charge appended to a due.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Penalty {
    /// Penalty id (UUIDv4, no dashes).
    pub id: String,
    pub amount: f64,
    pub reason: String,
    pub added_by: String,
    pub added_at: String,
}

/// A financial obligation assigned to a pharmacy for a given year/type.
///
/// At most one due exists per (pharmacy_id, due_type_id, year) — enforced
/// by a unique index in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Due {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    pub pharmacy_id: String,
    pub due_type_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base amount, before penalties.
    pub amount: f64,

    /// Base amount plus all penalties. Derived by [`Due::recompute`].
    pub total_amount: f64,

    /// Sum of applied payments.
    #[serde(default)]
    pub amount_paid: f64,

    /// `total_amount - amount_paid`. Derived by [`Due::recompute`].
    pub balance: f64,

    /// Payment deadline, `YYYY-MM-DD`.
    pub due_date: String,

    /// Assignment year of the obligation.
    pub year: i32,

    /// Derived from balance/amount_paid/due_date by [`Due::recompute`].
    pub payment_status: PaymentStatus,

    #[serde(default)]
    pub penalties: Vec<Penalty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

impl Due {
    /// Recompute the derived fields from base amount, penalties and
    /// payments. Called at every mutation site — penalty add/remove,
    /// payment application, manual pay — so the invariant
    /// `balance == total_amount - amount_paid` holds after every write.
    pub fn recompute(&mut self, today: NaiveDate) {
        let penalty_total: f64 = self.penalties.iter().map(|p| p.amount).sum();
        self.total_amount = self.amount + penalty_total;
        self.balance = self.total_amount - self.amount_paid;

        self.payment_status = if self.balance <= 0.0 {
            PaymentStatus::Paid
        } else if self.amount_paid > 0.0 {
            PaymentStatus::PartiallyPaid
        } else if self.is_past_due(today) {
            PaymentStatus::Overdue
        } else {
            PaymentStatus::Pending
        };
    }

    fn is_past_due(&self, today: NaiveDate) -> bool {
        match NaiveDate::parse_from_str(&self.due_date, "%Y-%m-%d") {
            Ok(due) => due < today,
            // Unparseable deadline never flips a due to overdue.
            Err(_) => false,
        }
    }
}

/// Input for creating a single due.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDue {
    pub pharmacy_id: String,
    pub due_type_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    /// Defaults to the due date's year.
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_recurring: bool,
}

/// How `assign_dues` selects its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    /// All pharmacies with active registration.
    Bulk,
    /// An explicit pharmacy id list.
    Individual,
}

/// Input for bulk/individual due assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignDuesInput {
    pub due_type_id: String,
    pub assignment_type: AssignmentType,
    #[serde(default)]
    pub amount: Option<f64>,
    pub due_date: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Required for individual assignment.
    #[serde(default)]
    pub pharmacy_ids: Vec<String>,
}

/// Per-target failure during assignment.
#[derive(Debug, Clone, Serialize)]
pub struct AssignError {
    pub pharmacy_id: String,
    pub message: String,
}

/// Partial-success summary of an assignment run.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub created: Vec<Due>,
    pub errors: Vec<AssignError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_due(amount: f64) -> Due {
        Due {
            id: "d1".into(),
            pharmacy_id: "p1".into(),
            due_type_id: "t1".into(),
            title: "Annual dues".into(),
            description: None,
            amount,
            total_amount: 0.0,
            amount_paid: 0.0,
            balance: 0.0,
            due_date: "2025-06-30".into(),
            year: 2025,
            payment_status: PaymentStatus::Pending,
            penalties: vec![],
            payment_date: None,
            payment_reference: None,
            is_recurring: false,
            next_due_date: None,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn penalty_add_and_remove_round_trips_amounts() {
        let mut due = base_due(1000.0);
        due.recompute(day("2025-01-15"));
        assert_eq!(due.total_amount, 1000.0);
        assert_eq!(due.balance, 1000.0);

        due.penalties.push(Penalty {
            id: "pen1".into(),
            amount: 200.0,
            reason: "late".into(),
            added_by: "admin".into(),
            added_at: "2025-02-01T00:00:00Z".into(),
        });
        due.recompute(day("2025-01-15"));
        assert_eq!(due.total_amount, 1200.0);
        assert_eq!(due.balance, 1200.0);
        assert_eq!(due.amount_paid, 0.0);

        due.penalties.clear();
        due.recompute(day("2025-01-15"));
        assert_eq!(due.total_amount, 1000.0);
        assert_eq!(due.balance, 1000.0);
    }

    #[test]
    fn status_derivation_order() {
        let mut due = base_due(1000.0);

        // Before the deadline, unpaid → pending.
        due.recompute(day("2025-06-01"));
        assert_eq!(due.payment_status, PaymentStatus::Pending);

        // After the deadline, unpaid → overdue.
        due.recompute(day("2025-07-01"));
        assert_eq!(due.payment_status, PaymentStatus::Overdue);

        // Partial payment wins over overdue.
        due.amount_paid = 400.0;
        due.recompute(day("2025-07-01"));
        assert_eq!(due.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(due.balance, 600.0);

        // Full payment → paid.
        due.amount_paid = 1000.0;
        due.recompute(day("2025-07-01"));
        assert_eq!(due.payment_status, PaymentStatus::Paid);
        assert_eq!(due.balance, 0.0);

        // Overpayment still reads as paid, with a negative balance.
        due.amount_paid = 1100.0;
        due.recompute(day("2025-07-01"));
        assert_eq!(due.payment_status, PaymentStatus::Paid);
        assert_eq!(due.balance, -100.0);
    }

    #[test]
    fn exact_due_date_is_not_overdue() {
        let mut due = base_due(500.0);
        due.recompute(day("2025-06-30"));
        assert_eq!(due.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn unparseable_due_date_never_overdue() {
        let mut due = base_due(500.0);
        due.due_date = "not-a-date".into();
        due.recompute(day("2099-01-01"));
        assert_eq!(due.payment_status, PaymentStatus::Pending);
    }
}
