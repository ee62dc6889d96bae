use acpn_core::ServiceError;

use crate::model::{AssignDuesInput, AssignError, AssignmentOutcome, AssignmentType, CreateDue};
use crate::service::DuesService;

impl DuesService {
    /// Assign a due to a set of pharmacies.
    ///
    /// Bulk assignment targets every pharmacy with active registration;
    /// individual assignment takes an explicit, non-empty id list.
    /// Processing is sequential and best-effort: a failure on one target
    /// (typically "due already exists") is collected as a per-item error
    /// and never aborts the rest. Not atomic, by design.
    pub fn assign_dues(&self, input: AssignDuesInput) -> Result<AssignmentOutcome, ServiceError> {
        let due_type = self.get_due_type(&input.due_type_id)?;

        let amount = input.amount.unwrap_or(due_type.default_amount);
        if amount <= 0.0 {
            return Err(ServiceError::Validation("amount must be greater than 0".into()));
        }

        let targets: Vec<String> = match input.assignment_type {
            AssignmentType::Bulk => self
                .registry
                .active_pharmacies()?
                .into_iter()
                .map(|p| p.id)
                .collect(),
            AssignmentType::Individual => {
                if input.pharmacy_ids.is_empty() {
                    return Err(ServiceError::Validation(
                        "individual assignment requires at least one pharmacy id".into(),
                    ));
                }
                input.pharmacy_ids.clone()
            }
        };

        let mut outcome = AssignmentOutcome {
            created: Vec::new(),
            errors: Vec::new(),
        };

        for pharmacy_id in targets {
            let result = self.create_due(CreateDue {
                pharmacy_id: pharmacy_id.clone(),
                due_type_id: input.due_type_id.clone(),
                title: input.title.clone(),
                description: input.description.clone(),
                amount,
                due_date: input.due_date.clone(),
                year: input.year,
                is_recurring: due_type.is_recurring,
            });
            match result {
                Ok(due) => outcome.created.push(due),
                Err(e) => outcome.errors.push(AssignError {
                    pharmacy_id,
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            created = outcome.created.len(),
            errors = outcome.errors.len(),
            "due assignment finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{add_due_type, add_pharmacy, test_service};

    fn bulk_input(due_type_id: &str) -> AssignDuesInput {
        AssignDuesInput {
            due_type_id: due_type_id.into(),
            assignment_type: AssignmentType::Bulk,
            amount: Some(1000.0),
            due_date: "2025-06-30".into(),
            year: None,
            title: None,
            description: None,
            pharmacy_ids: vec![],
        }
    }

    #[test]
    fn bulk_targets_only_active_pharmacies() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual");
        add_pharmacy(&svc, "a", true);
        add_pharmacy(&svc, "b", true);
        add_pharmacy(&svc, "c", true);
        add_pharmacy(&svc, "d", false);

        let outcome = svc.assign_dues(bulk_input(&dt.id)).unwrap();
        assert_eq!(outcome.created.len(), 3);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn second_identical_run_reports_duplicates_not_new_dues() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual");
        add_pharmacy(&svc, "a", true);
        add_pharmacy(&svc, "b", true);

        let first = svc.assign_dues(bulk_input(&dt.id)).unwrap();
        assert_eq!(first.created.len(), 2);

        let second = svc.assign_dues(bulk_input(&dt.id)).unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.errors.len(), 2);
        assert!(second.errors[0].message.contains("already exists"));
    }

    #[test]
    fn individual_requires_targets_and_continues_past_failures() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual");
        let ph = add_pharmacy(&svc, "a", true);

        // Empty target list is a validation error.
        let mut empty = bulk_input(&dt.id);
        empty.assignment_type = AssignmentType::Individual;
        assert!(matches!(
            svc.assign_dues(empty).unwrap_err(),
            ServiceError::Validation(_)
        ));

        // A bad id mid-list doesn't abort the rest.
        let mut mixed = bulk_input(&dt.id);
        mixed.assignment_type = AssignmentType::Individual;
        mixed.pharmacy_ids = vec!["ghost".into(), ph.id.clone()];
        let outcome = svc.assign_dues(mixed).unwrap();
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].pharmacy_id, "ghost");
    }

    #[test]
    fn amount_defaults_to_due_type_amount() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual"); // default_amount = 1000.0
        add_pharmacy(&svc, "a", true);

        let mut input = bulk_input(&dt.id);
        input.amount = None;
        let outcome = svc.assign_dues(input).unwrap();
        assert_eq!(outcome.created[0].amount, 1000.0);
    }
}
