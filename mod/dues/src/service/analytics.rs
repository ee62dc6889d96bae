//! Reporting over dues — pure aggregation, computed by the store.

use serde::Serialize;

use acpn_core::ServiceError;
use acpn_sql::{Row, Value};

use crate::service::DuesService;

/// Overall dues posture.
#[derive(Debug, Clone, Serialize)]
pub struct DuesStats {
    pub total_dues: i64,
    pub total_amount: f64,
    pub total_paid: f64,
    pub total_outstanding: f64,
    pub paid_count: i64,
    pub pending_count: i64,
    pub overdue_count: i64,
    pub partially_paid_count: i64,
    /// paid dues / all dues × 100; 0 when there are no dues.
    pub compliance_rate: f64,
    /// collected amount / assessed amount × 100; 0 when nothing assessed.
    pub collection_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearBreakdown {
    pub year: i32,
    pub due_count: i64,
    pub total_amount: f64,
    pub amount_paid: f64,
    pub collection_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeBreakdown {
    pub due_type_id: String,
    pub due_type_name: String,
    pub due_count: i64,
    pub total_amount: f64,
    pub amount_paid: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Defaulter {
    pub pharmacy_id: String,
    pub pharmacy_name: String,
    pub outstanding: f64,
    pub due_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuesAnalytics {
    pub by_year: Vec<YearBreakdown>,
    pub by_type: Vec<TypeBreakdown>,
    pub top_defaulters: Vec<Defaulter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PharmacyDuesAnalytics {
    pub pharmacy_id: String,
    pub pharmacy_name: String,
    pub total_dues: i64,
    pub total_amount: f64,
    pub amount_paid: f64,
    pub outstanding: f64,
    pub paid_count: i64,
    pub compliance_rate: f64,
}

fn rate(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn num(row: &Row, col: &str) -> f64 {
    row.get_num(col).unwrap_or(0.0)
}

fn int(row: &Row, col: &str) -> i64 {
    row.get_i64(col).unwrap_or(0)
}

impl DuesService {
    pub fn dues_stats(&self) -> Result<DuesStats, ServiceError> {
        let totals = self
            .sql
            .query(
                "SELECT COUNT(*) as cnt, \
                        COALESCE(SUM(total_amount), 0) as total, \
                        COALESCE(SUM(amount_paid), 0) as paid, \
                        COALESCE(SUM(balance), 0) as outstanding \
                 FROM dues",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let totals = totals
            .first()
            .ok_or_else(|| ServiceError::Internal("empty aggregate result".into()))?;

        let by_status = self
            .sql
            .query(
                "SELECT payment_status, COUNT(*) as cnt FROM dues GROUP BY payment_status",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut paid_count = 0;
        let mut pending_count = 0;
        let mut overdue_count = 0;
        let mut partially_paid_count = 0;
        for row in &by_status {
            let count = int(row, "cnt");
            match row.get_str("payment_status") {
                Some("paid") => paid_count = count,
                Some("pending") => pending_count = count,
                Some("overdue") => overdue_count = count,
                Some("partially_paid") => partially_paid_count = count,
                _ => {}
            }
        }

        let total_dues = int(totals, "cnt");
        let total_amount = num(totals, "total");
        let total_paid = num(totals, "paid");

        Ok(DuesStats {
            total_dues,
            total_amount,
            total_paid,
            total_outstanding: num(totals, "outstanding"),
            paid_count,
            pending_count,
            overdue_count,
            partially_paid_count,
            compliance_rate: rate(paid_count as f64, total_dues as f64),
            collection_rate: rate(total_paid, total_amount),
        })
    }

    pub fn dues_analytics(&self) -> Result<DuesAnalytics, ServiceError> {
        // Per-year rollup.
        let year_rows = self
            .sql
            .query(
                "SELECT year, COUNT(*) as cnt, \
                        COALESCE(SUM(total_amount), 0) as total, \
                        COALESCE(SUM(amount_paid), 0) as paid \
                 FROM dues GROUP BY year ORDER BY year",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let by_year = year_rows
            .iter()
            .map(|row| {
                let total = num(row, "total");
                let paid = num(row, "paid");
                YearBreakdown {
                    year: int(row, "year") as i32,
                    due_count: int(row, "cnt"),
                    total_amount: total,
                    amount_paid: paid,
                    collection_rate: rate(paid, total),
                }
            })
            .collect();

        // Per-type rollup, names resolved from the due_types table.
        let type_rows = self
            .sql
            .query(
                "SELECT d.due_type_id, t.name as type_name, COUNT(*) as cnt, \
                        COALESCE(SUM(d.total_amount), 0) as total, \
                        COALESCE(SUM(d.amount_paid), 0) as paid \
                 FROM dues d LEFT JOIN due_types t ON t.id = d.due_type_id \
                 GROUP BY d.due_type_id ORDER BY total DESC",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let by_type = type_rows
            .iter()
            .map(|row| TypeBreakdown {
                due_type_id: row.get_str("due_type_id").unwrap_or_default().to_string(),
                due_type_name: row.get_str("type_name").unwrap_or("unknown").to_string(),
                due_count: int(row, "cnt"),
                total_amount: num(row, "total"),
                amount_paid: num(row, "paid"),
            })
            .collect();

        // Pharmacies ranked by outstanding balance, top 10.
        let defaulter_rows = self
            .sql
            .query(
                "SELECT pharmacy_id, SUM(balance) as outstanding, COUNT(*) as cnt \
                 FROM dues WHERE balance > 0 \
                 GROUP BY pharmacy_id ORDER BY outstanding DESC LIMIT 10",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let mut top_defaulters = Vec::new();
        for row in &defaulter_rows {
            let pharmacy_id = row.get_str("pharmacy_id").unwrap_or_default().to_string();
            let pharmacy_name = self
                .registry
                .get_pharmacy(&pharmacy_id)
                .map(|p| p.name)
                .unwrap_or_else(|_| "unknown".to_string());
            top_defaulters.push(Defaulter {
                pharmacy_id,
                pharmacy_name,
                outstanding: num(row, "outstanding"),
                due_count: int(row, "cnt"),
            });
        }

        Ok(DuesAnalytics {
            by_year,
            by_type,
            top_defaulters,
        })
    }

    pub fn pharmacy_dues_analytics(
        &self,
        pharmacy_id: &str,
    ) -> Result<PharmacyDuesAnalytics, ServiceError> {
        let pharmacy = self.registry.get_pharmacy(pharmacy_id)?;

        let rows = self
            .sql
            .query(
                "SELECT COUNT(*) as cnt, \
                        COALESCE(SUM(total_amount), 0) as total, \
                        COALESCE(SUM(amount_paid), 0) as paid, \
                        COALESCE(SUM(balance), 0) as outstanding, \
                        COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN 1 ELSE 0 END), 0) \
                            as paid_cnt \
                 FROM dues WHERE pharmacy_id = ?1",
                &[Value::Text(pharmacy_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::Internal("empty aggregate result".into()))?;

        let total_dues = int(row, "cnt");
        let paid_count = int(row, "paid_cnt");

        Ok(PharmacyDuesAnalytics {
            pharmacy_id: pharmacy.id,
            pharmacy_name: pharmacy.name,
            total_dues,
            total_amount: num(row, "total"),
            amount_paid: num(row, "paid"),
            outstanding: num(row, "outstanding"),
            paid_count,
            compliance_rate: rate(paid_count as f64, total_dues as f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateDue;
    use crate::service::test_support::{add_due_type, add_pharmacy, test_service};

    fn due_for(
        svc: &DuesService,
        pharmacy_id: &str,
        due_type_id: &str,
        amount: f64,
        due_date: &str,
    ) -> crate::model::Due {
        svc.create_due(CreateDue {
            pharmacy_id: pharmacy_id.into(),
            due_type_id: due_type_id.into(),
            title: None,
            description: None,
            amount,
            due_date: due_date.into(),
            year: None,
            is_recurring: false,
        })
        .unwrap()
    }

    #[test]
    fn empty_store_yields_zero_rates() {
        let svc = test_service();
        let stats = svc.dues_stats().unwrap();
        assert_eq!(stats.total_dues, 0);
        assert_eq!(stats.compliance_rate, 0.0);
        assert_eq!(stats.collection_rate, 0.0);

        let analytics = svc.dues_analytics().unwrap();
        assert!(analytics.by_year.is_empty());
        assert!(analytics.top_defaulters.is_empty());
    }

    #[test]
    fn stats_reflect_payments() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual");
        let a = add_pharmacy(&svc, "a", true);
        let b = add_pharmacy(&svc, "b", true);

        let due_a = due_for(&svc, &a.id, &dt.id, 1000.0, "2025-06-30");
        due_for(&svc, &b.id, &dt.id, 1000.0, "2025-06-30");

        svc.mark_paid(&due_a.id, None).unwrap();

        let stats = svc.dues_stats().unwrap();
        assert_eq!(stats.total_dues, 2);
        assert_eq!(stats.paid_count, 1);
        assert_eq!(stats.total_amount, 2000.0);
        assert_eq!(stats.total_paid, 1000.0);
        assert_eq!(stats.compliance_rate, 50.0);
        assert_eq!(stats.collection_rate, 50.0);
    }

    #[test]
    fn defaulters_ranked_by_outstanding_descending() {
        let svc = test_service();
        let dt = add_due_type(&svc, "Annual");
        let small = add_pharmacy(&svc, "small", true);
        let big = add_pharmacy(&svc, "big", true);
        let settled = add_pharmacy(&svc, "settled", true);

        due_for(&svc, &small.id, &dt.id, 500.0, "2025-06-30");
        due_for(&svc, &big.id, &dt.id, 5000.0, "2025-06-30");
        let paid = due_for(&svc, &settled.id, &dt.id, 800.0, "2025-06-30");
        svc.mark_paid(&paid.id, None).unwrap();

        let analytics = svc.dues_analytics().unwrap();
        assert_eq!(analytics.top_defaulters.len(), 2);
        assert_eq!(analytics.top_defaulters[0].pharmacy_name, "big");
        assert_eq!(analytics.top_defaulters[0].outstanding, 5000.0);
        assert_eq!(analytics.top_defaulters[1].pharmacy_name, "small");
    }

    #[test]
    fn per_pharmacy_compliance() {
        let svc = test_service();
        let annual = add_due_type(&svc, "Annual");
        let levy = add_due_type(&svc, "Levy");
        let ph = add_pharmacy(&svc, "hp", true);

        let d1 = due_for(&svc, &ph.id, &annual.id, 1000.0, "2025-06-30");
        due_for(&svc, &ph.id, &levy.id, 400.0, "2025-09-30");
        svc.mark_paid(&d1.id, None).unwrap();

        let report = svc.pharmacy_dues_analytics(&ph.id).unwrap();
        assert_eq!(report.total_dues, 2);
        assert_eq!(report.paid_count, 1);
        assert_eq!(report.compliance_rate, 50.0);
        assert_eq!(report.outstanding, 400.0);

        assert!(matches!(
            svc.pharmacy_dues_analytics("ghost").unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
