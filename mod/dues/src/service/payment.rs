use acpn_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::Value;

use crate::model::{ApprovalStatus, Due, DuePayment, SubmitPayment};
use crate::service::DuesService;

/// Filters for payment listing.
#[derive(Debug, Default)]
pub struct PaymentFilters {
    pub due_id: Option<String>,
    pub pharmacy_id: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
}

impl DuesService {
    /// Submit a payment against a due. Starts pending review.
    pub fn submit_payment(
        &self,
        input: SubmitPayment,
        submitted_by: &str,
    ) -> Result<DuePayment, ServiceError> {
        if input.amount <= 0.0 {
            return Err(ServiceError::Validation(
                "payment amount must be greater than 0".into(),
            ));
        }
        if input.payment_method.trim().is_empty() {
            return Err(ServiceError::Validation("payment method cannot be empty".into()));
        }

        let due: Due = self.get_record("dues", &input.due_id)?;

        let now = now_rfc3339();
        let payment = DuePayment {
            id: new_id(),
            due_id: due.id,
            pharmacy_id: due.pharmacy_id,
            amount: input.amount,
            payment_method: input.payment_method,
            payment_reference: input.payment_reference,
            receipt_url: input.receipt_url,
            approval_status: ApprovalStatus::Pending,
            submitted_by: submitted_by.to_string(),
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.insert_record(
            "due_payments",
            &payment.id,
            &payment,
            &[
                ("due_id", Value::Text(payment.due_id.clone())),
                ("pharmacy_id", Value::Text(payment.pharmacy_id.clone())),
                (
                    "approval_status",
                    Value::Text(payment.approval_status.as_str().into()),
                ),
                ("amount", Value::Real(payment.amount)),
                ("created_at", Value::Text(payment.created_at.clone())),
                ("updated_at", Value::Text(payment.updated_at.clone())),
            ],
        )?;

        Ok(payment)
    }

    pub fn get_payment(&self, id: &str) -> Result<DuePayment, ServiceError> {
        self.get_record("due_payments", id)
    }

    pub fn list_payments(
        &self,
        params: &ListParams,
        filters: &PaymentFilters,
    ) -> Result<ListResult<DuePayment>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref did) = filters.due_id {
            f.push(("due_id", Value::Text(did.clone())));
        }
        if let Some(ref pid) = filters.pharmacy_id {
            f.push(("pharmacy_id", Value::Text(pid.clone())));
        }
        if let Some(status) = filters.approval_status {
            f.push(("approval_status", Value::Text(status.as_str().into())));
        }
        let (items, total) =
            self.list_records("due_payments", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Approve a pending payment and apply its amount to the due.
    ///
    /// The pending guard makes the transition exactly-once: a second
    /// review of the same payment is a `Conflict`.
    pub fn approve_payment(&self, id: &str, approved_by: &str) -> Result<DuePayment, ServiceError> {
        let mut payment: DuePayment = self.get_record("due_payments", id)?;

        if payment.approval_status != ApprovalStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "payment has already been {}",
                payment.approval_status.as_str()
            )));
        }

        let now = chrono::Utc::now();
        payment.approval_status = ApprovalStatus::Approved;
        payment.approved_by = Some(approved_by.to_string());
        payment.approved_at = Some(now.to_rfc3339());
        payment.updated_at = now.to_rfc3339();

        self.persist_payment(&payment)?;

        // Apply to the due and recompute.
        let mut due: Due = self.get_record("dues", &payment.due_id)?;
        due.amount_paid += payment.amount;
        if due.payment_date.is_none() {
            due.payment_date = Some(now.to_rfc3339());
        }
        if due.payment_reference.is_none() {
            due.payment_reference = payment.payment_reference.clone();
        }
        due.updated_at = now.to_rfc3339();
        due.recompute(now.date_naive());
        self.persist_due(&due)?;

        tracing::info!(payment_id = %id, due_id = %due.id, "payment approved");
        Ok(payment)
    }

    /// Reject a pending payment. The due is left untouched.
    pub fn reject_payment(
        &self,
        id: &str,
        rejected_by: &str,
        reason: &str,
    ) -> Result<DuePayment, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation(
                "a rejection reason is required".into(),
            ));
        }

        let mut payment: DuePayment = self.get_record("due_payments", id)?;

        if payment.approval_status != ApprovalStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "payment has already been {}",
                payment.approval_status.as_str()
            )));
        }

        let now = now_rfc3339();
        payment.approval_status = ApprovalStatus::Rejected;
        payment.approved_by = Some(rejected_by.to_string());
        payment.approved_at = Some(now.clone());
        payment.rejection_reason = Some(reason.to_string());
        payment.updated_at = now;

        self.persist_payment(&payment)?;
        tracing::info!(payment_id = %id, "payment rejected");
        Ok(payment)
    }

    fn persist_payment(&self, payment: &DuePayment) -> Result<(), ServiceError> {
        self.update_record(
            "due_payments",
            &payment.id,
            payment,
            &[
                (
                    "approval_status",
                    Value::Text(payment.approval_status.as_str().into()),
                ),
                ("updated_at", Value::Text(payment.updated_at.clone())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateDue, PaymentStatus};
    use crate::service::test_support::{add_due_type, add_pharmacy, test_service};

    fn seeded_due(svc: &DuesService) -> Due {
        let dt = add_due_type(svc, "Annual");
        let ph = add_pharmacy(svc, "hp", true);
        svc.create_due(CreateDue {
            pharmacy_id: ph.id,
            due_type_id: dt.id,
            title: None,
            description: None,
            amount: 1000.0,
            due_date: "2025-06-30".into(),
            year: None,
            is_recurring: false,
        })
        .unwrap()
    }

    fn submit(svc: &DuesService, due_id: &str, amount: f64) -> DuePayment {
        svc.submit_payment(
            SubmitPayment {
                due_id: due_id.into(),
                amount,
                payment_method: "transfer".into(),
                payment_reference: Some("TXN-1".into()),
                receipt_url: None,
            },
            "owner-hp",
        )
        .unwrap()
    }

    #[test]
    fn approval_applies_amount_and_recomputes() {
        let svc = test_service();
        let due = seeded_due(&svc);
        let payment = submit(&svc, &due.id, 400.0);

        svc.approve_payment(&payment.id, "admin1").unwrap();

        let due = svc.get_due(&due.id).unwrap();
        assert_eq!(due.amount_paid, 400.0);
        assert_eq!(due.balance, 600.0);
        assert_eq!(due.payment_status, PaymentStatus::PartiallyPaid);

        // A second approved payment settles it.
        let payment2 = submit(&svc, &due.id, 600.0);
        svc.approve_payment(&payment2.id, "admin1").unwrap();
        let due = svc.get_due(&due.id).unwrap();
        assert_eq!(due.balance, 0.0);
        assert_eq!(due.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn rejection_leaves_due_untouched() {
        let svc = test_service();
        let due = seeded_due(&svc);
        let payment = submit(&svc, &due.id, 400.0);

        let rejected = svc
            .reject_payment(&payment.id, "admin1", "receipt unreadable")
            .unwrap();
        assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("receipt unreadable"));

        let due = svc.get_due(&due.id).unwrap();
        assert_eq!(due.amount_paid, 0.0);
        assert_eq!(due.balance, 1000.0);
    }

    #[test]
    fn review_transitions_exactly_once() {
        let svc = test_service();
        let due = seeded_due(&svc);
        let payment = submit(&svc, &due.id, 400.0);

        svc.approve_payment(&payment.id, "admin1").unwrap();

        // Approving or rejecting again conflicts, and the due's paid
        // amount is not double-applied.
        assert!(matches!(
            svc.approve_payment(&payment.id, "admin2").unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            svc.reject_payment(&payment.id, "admin2", "too late").unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert_eq!(svc.get_due(&due.id).unwrap().amount_paid, 400.0);
    }

    #[test]
    fn rejection_requires_reason() {
        let svc = test_service();
        let due = seeded_due(&svc);
        let payment = submit(&svc, &due.id, 400.0);
        assert!(matches!(
            svc.reject_payment(&payment.id, "admin1", "  ").unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn submission_validation() {
        let svc = test_service();
        let due = seeded_due(&svc);

        let err = svc
            .submit_payment(
                SubmitPayment {
                    due_id: due.id.clone(),
                    amount: 0.0,
                    payment_method: "cash".into(),
                    payment_reference: None,
                    receipt_url: None,
                },
                "owner-hp",
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .submit_payment(
                SubmitPayment {
                    due_id: "ghost".into(),
                    amount: 10.0,
                    payment_method: "cash".into(),
                    payment_reference: None,
                    receipt_url: None,
                },
                "owner-hp",
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
