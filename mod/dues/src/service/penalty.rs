use acpn_core::{new_id, now_rfc3339, ServiceError};

use crate::model::{Due, Penalty};
use crate::service::DuesService;

impl DuesService {
    /// Append a penalty to a due and recompute its balance.
    pub fn add_penalty(
        &self,
        due_id: &str,
        amount: f64,
        reason: &str,
        added_by: &str,
    ) -> Result<Due, ServiceError> {
        if amount <= 0.0 {
            return Err(ServiceError::Validation(
                "penalty amount must be greater than 0".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation("penalty reason cannot be empty".into()));
        }

        let mut due: Due = self.get_record("dues", due_id)?;
        due.penalties.push(Penalty {
            id: new_id(),
            amount,
            reason: reason.to_string(),
            added_by: added_by.to_string(),
            added_at: now_rfc3339(),
        });
        due.updated_at = now_rfc3339();
        due.recompute(chrono::Utc::now().date_naive());

        self.persist_due(&due)?;
        tracing::info!(due_id = %due_id, amount, "penalty added");
        Ok(due)
    }

    /// Remove a penalty by id and recompute. `NotFound` when the penalty
    /// id is not on the due.
    pub fn remove_penalty(&self, due_id: &str, penalty_id: &str) -> Result<Due, ServiceError> {
        let mut due: Due = self.get_record("dues", due_id)?;

        if !due.penalties.iter().any(|p| p.id == penalty_id) {
            return Err(ServiceError::NotFound(format!(
                "penalty {} not found on due {}",
                penalty_id, due_id
            )));
        }

        due.penalties.retain(|p| p.id != penalty_id);
        due.updated_at = now_rfc3339();
        due.recompute(chrono::Utc::now().date_naive());

        self.persist_due(&due)?;
        tracing::info!(due_id = %due_id, penalty_id = %penalty_id, "penalty removed");
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateDue;
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

    #[test]
    fn add_then_remove_restores_amounts() {
        let svc = test_service();
        let due = seeded_due(&svc);

        let with_penalty = svc.add_penalty(&due.id, 200.0, "late filing", "admin1").unwrap();
        assert_eq!(with_penalty.total_amount, 1200.0);
        assert_eq!(with_penalty.balance, 1200.0);
        assert_eq!(with_penalty.amount_paid, 0.0);
        assert_eq!(with_penalty.penalties.len(), 1);

        let penalty_id = with_penalty.penalties[0].id.clone();
        let restored = svc.remove_penalty(&due.id, &penalty_id).unwrap();
        assert_eq!(restored.total_amount, 1000.0);
        assert_eq!(restored.balance, 1000.0);
        assert!(restored.penalties.is_empty());
    }

    #[test]
    fn unknown_penalty_id_is_not_found() {
        let svc = test_service();
        let due = seeded_due(&svc);
        assert!(matches!(
            svc.remove_penalty(&due.id, "nope").unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn penalty_validation() {
        let svc = test_service();
        let due = seeded_due(&svc);
        assert!(svc.add_penalty(&due.id, 0.0, "zero", "a").is_err());
        assert!(svc.add_penalty(&due.id, -5.0, "negative", "a").is_err());
        assert!(svc.add_penalty(&due.id, 10.0, "  ", "a").is_err());
    }

    #[test]
    fn penalty_on_partially_paid_due_keeps_invariant() {
        let svc = test_service();
        let due = seeded_due(&svc);

        // Apply a partial payment through the review workflow.
        let payment = svc
            .submit_payment(
                crate::model::SubmitPayment {
                    due_id: due.id.clone(),
                    amount: 400.0,
                    payment_method: "transfer".into(),
                    payment_reference: None,
                    receipt_url: None,
                },
                "owner-hp",
            )
            .unwrap();
        svc.approve_payment(&payment.id, "admin1").unwrap();

        let after = svc.add_penalty(&due.id, 100.0, "late", "admin1").unwrap();
        assert_eq!(after.total_amount, 1100.0);
        assert_eq!(after.amount_paid, 400.0);
        assert_eq!(after.balance, 700.0);
    }
}
