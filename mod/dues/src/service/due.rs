use chrono::Datelike;

use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::Value;

use crate::model::{CreateDue, Due, PaymentStatus};
use crate::service::DuesService;

/// Filters for due listing.
#[derive(Debug, Default)]
pub struct DueFilters {
    pub pharmacy_id: Option<String>,
    pub due_type_id: Option<String>,
    pub year: Option<i32>,
    pub payment_status: Option<PaymentStatus>,
}

impl DuesService {
    /// Create a due for a (pharmacy, due type, year).
    ///
    /// The unique index on that triple is the duplicate guard: a
    /// concurrent or repeated create surfaces as `Conflict` from the
    /// insert itself, with no prior existence check to race past.
    pub fn create_due(&self, input: CreateDue) -> Result<Due, ServiceError> {
        if input.amount <= 0.0 {
            return Err(ServiceError::Validation("amount must be greater than 0".into()));
        }

        let pharmacy = self.registry.get_pharmacy(&input.pharmacy_id)?;
        let due_type = self.get_due_type(&input.due_type_id)?;

        let year = match input.year {
            Some(y) => y,
            None => chrono::NaiveDate::parse_from_str(&input.due_date, "%Y-%m-%d")
                .map_err(|_| {
                    ServiceError::Validation("due_date must be YYYY-MM-DD".into())
                })?
                .year(),
        };

        let now = now_rfc3339();
        let mut due = Due {
            id: new_id(),
            pharmacy_id: pharmacy.id,
            due_type_id: due_type.id,
            title: input.title.unwrap_or_else(|| due_type.name.clone()),
            description: input.description,
            amount: input.amount,
            total_amount: 0.0,
            amount_paid: 0.0,
            balance: 0.0,
            due_date: input.due_date,
            year,
            payment_status: PaymentStatus::Pending,
            penalties: Vec::new(),
            payment_date: None,
            payment_reference: None,
            is_recurring: input.is_recurring || due_type.is_recurring,
            next_due_date: None,
            created_at: now.clone(),
            updated_at: now,
        };
        due.recompute(chrono::Utc::now().date_naive());

        self.insert_due(&due).map_err(|e| match e {
            ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                "due already exists for this pharmacy, due type and year ({})",
                due.year
            )),
            other => other,
        })?;

        Ok(due)
    }

    pub fn get_due(&self, id: &str) -> Result<Due, ServiceError> {
        self.get_record("dues", id)
    }

    pub fn list_dues(
        &self,
        params: &ListParams,
        filters: &DueFilters,
    ) -> Result<ListResult<Due>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref pid) = filters.pharmacy_id {
            f.push(("pharmacy_id", Value::Text(pid.clone())));
        }
        if let Some(ref tid) = filters.due_type_id {
            f.push(("due_type_id", Value::Text(tid.clone())));
        }
        if let Some(year) = filters.year {
            f.push(("year", Value::Integer(year as i64)));
        }
        if let Some(status) = filters.payment_status {
            f.push(("payment_status", Value::Text(status.as_str().into())));
        }
        let (items, total) = self.list_records("dues", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// All dues of one pharmacy, newest first.
    pub fn pharmacy_dues(&self, pharmacy_id: &str) -> Result<Vec<Due>, ServiceError> {
        // Ensure the pharmacy exists so a typo'd id reads as NotFound
        // rather than an empty list.
        let _pharmacy = self.registry.get_pharmacy(pharmacy_id)?;
        let (items, _) = self.list_records(
            "dues",
            &[("pharmacy_id", Value::Text(pharmacy_id.to_string()))],
            500,
            0,
        )?;
        Ok(items)
    }

    /// Patch mutable fields (title, description, amount, due date,
    /// recurrence) and recompute the derived state.
    pub fn update_due(&self, id: &str, patch: serde_json::Value) -> Result<Due, ServiceError> {
        let current: Due = self.get_record("dues", id)?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            for protected in [
                "id",
                "pharmacy_id",
                "due_type_id",
                "year",
                "penalties",
                "amount_paid",
                "balance",
                "total_amount",
                "payment_status",
                "payment_date",
                "payment_reference",
                "created_at",
            ] {
                obj.remove(protected);
            }
        }

        let mut base = serde_json::to_value(&current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let mut updated: Due =
            serde_json::from_value(base).map_err(|e| ServiceError::Internal(e.to_string()))?;

        if updated.amount <= 0.0 {
            return Err(ServiceError::Validation("amount must be greater than 0".into()));
        }

        updated.recompute(chrono::Utc::now().date_naive());
        self.persist_due(&updated)?;
        Ok(updated)
    }

    pub fn delete_due(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record("dues", id)
    }

    /// Administrative override: mark a due fully paid without a payment
    /// record. Distinct from the submit/approve workflow.
    pub fn mark_paid(
        &self,
        id: &str,
        payment_reference: Option<String>,
    ) -> Result<Due, ServiceError> {
        let mut due: Due = self.get_record("dues", id)?;

        let now = chrono::Utc::now();
        due.amount_paid = due.amount + due.penalties.iter().map(|p| p.amount).sum::<f64>();
        due.payment_date = Some(now.to_rfc3339());
        due.payment_reference = Some(
            payment_reference
                .unwrap_or_else(|| format!("Manual-{}", now.timestamp_millis())),
        );
        due.updated_at = now.to_rfc3339();
        due.recompute(now.date_naive());

        self.persist_due(&due)?;
        tracing::info!(due_id = %id, reference = ?due.payment_reference, "due marked paid");
        Ok(due)
    }

    // ── Persistence with derived columns ──

    pub(crate) fn insert_due(&self, due: &Due) -> Result<(), ServiceError> {
        self.insert_record(
            "dues",
            &due.id,
            due,
            &[
                ("pharmacy_id", Value::Text(due.pharmacy_id.clone())),
                ("due_type_id", Value::Text(due.due_type_id.clone())),
                ("year", Value::Integer(due.year as i64)),
                ("payment_status", Value::Text(due.payment_status.as_str().into())),
                ("due_date", Value::Text(due.due_date.clone())),
                ("total_amount", Value::Real(due.total_amount)),
                ("amount_paid", Value::Real(due.amount_paid)),
                ("balance", Value::Real(due.balance)),
                ("created_at", Value::Text(due.created_at.clone())),
                ("updated_at", Value::Text(due.updated_at.clone())),
            ],
        )
    }

    pub(crate) fn persist_due(&self, due: &Due) -> Result<(), ServiceError> {
        self.update_record(
            "dues",
            &due.id,
            due,
            &[
                ("payment_status", Value::Text(due.payment_status.as_str().into())),
                ("due_date", Value::Text(due.due_date.clone())),
                ("total_amount", Value::Real(due.total_amount)),
                ("amount_paid", Value::Real(due.amount_paid)),
                ("balance", Value::Real(due.balance)),
                ("updated_at", Value::Text(due.updated_at.clone())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{add_due_type, add_pharmacy, test_service};

    fn create_input(pharmacy_id: &str, due_type_id: &str) -> CreateDue {
        CreateDue {
            pharmacy_id: pharmacy_id.into(),
            due_type_id: due_type_id.into(),
            title: None,
            description: None,
            amount: 1000.0,
            due_date: "2025-06-30".into(),
            year: None,
            is_recurring: false,
        }
    }

    #[test]
    fn create_derives_year_title_and_balance() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual Registration");
        let ph = add_pharmacy(&svc, "hp", true);

        let due = svc.create_due(create_input(&ph.id, &dt.id)).unwrap();
        assert_eq!(due.year, 2025);
        assert_eq!(due.title, "Annual Registration");
        assert_eq!(due.total_amount, 1000.0);
        assert_eq!(due.balance, 1000.0);
        // Due type recurrence carries over.
        assert!(due.is_recurring);
    }

    #[test]
    fn duplicate_triple_is_conflict() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Levy");
        let ph = add_pharmacy(&svc, "hp", true);

        svc.create_due(create_input(&ph.id, &dt.id)).unwrap();
        let err = svc.create_due(create_input(&ph.id, &dt.id)).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // A different year is a different obligation.
        let mut next_year = create_input(&ph.id, &dt.id);
        next_year.due_date = "2026-06-30".into();
        svc.create_due(next_year).unwrap();
    }

    #[test]
    fn unknown_pharmacy_or_type_is_not_found() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Levy");
        let ph = add_pharmacy(&svc, "hp", true);

        assert!(matches!(
            svc.create_due(create_input("ghost", &dt.id)).unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            svc.create_due(create_input(&ph.id, "ghost")).unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn mark_paid_overrides_and_stamps_reference() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Levy");
        let ph = add_pharmacy(&svc, "hp", true);
        let due = svc.create_due(create_input(&ph.id, &dt.id)).unwrap();

        let paid = svc.mark_paid(&due.id, None).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.balance, 0.0);
        assert!(paid.payment_reference.as_deref().unwrap().starts_with("Manual-"));
        assert!(paid.payment_date.is_some());

        let explicit = svc.create_due({
            let mut i = create_input(&ph.id, &dt.id);
            i.due_date = "2026-01-31".into();
            i
        });
        let paid2 = svc
            .mark_paid(&explicit.unwrap().id, Some("TXN-42".into()))
            .unwrap();
        assert_eq!(paid2.payment_reference.as_deref(), Some("TXN-42"));
    }

    #[test]
    fn update_recomputes_but_protects_derived_fields() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Levy");
        let ph = add_pharmacy(&svc, "hp", true);
        let due = svc.create_due(create_input(&ph.id, &dt.id)).unwrap();

        let updated = svc
            .update_due(
                &due.id,
                serde_json::json!({
                    "amount": 2000.0,
                    "balance": 1.0,
                    "amount_paid": 9999.0,
                    "payment_status": "paid"
                }),
            )
            .unwrap();
        assert_eq!(updated.amount, 2000.0);
        assert_eq!(updated.total_amount, 2000.0);
        assert_eq!(updated.balance, 2000.0);
        assert_eq!(updated.amount_paid, 0.0);
        assert_ne!(updated.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn pharmacy_dues_requires_known_pharmacy() {
        let svc = test_service();
        assert!(matches!(
            svc.pharmacy_dues("ghost").unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
