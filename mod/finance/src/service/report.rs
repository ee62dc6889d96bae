//! Report generation — zero-filled month/day buckets plus category
//! breakdowns, all sums computed by the store.

use chrono::NaiveDate;
use serde::Serialize;

use acpn_core::ServiceError;
use acpn_sql::{Row, Value};

use crate::model::FinancialRecord;
use crate::service::FinanceService;

#[derive(Debug, Clone, Serialize)]
pub struct PeriodBucket {
    /// Month number (yearly report) or day of month (monthly report).
    pub period: u32,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub category: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTotals {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    /// Always 12 buckets, zero-filled for silent months.
    pub monthly_breakdown: Vec<PeriodBucket>,
    pub category_breakdown: Vec<CategoryBucket>,
    pub totals: ReportTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    /// One bucket per calendar day of the month, zero-filled.
    pub daily_breakdown: Vec<PeriodBucket>,
    pub category_breakdown: Vec<CategoryBucket>,
    pub totals: ReportTotals,
    pub transactions: Vec<FinancialRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomReport {
    pub start_date: String,
    pub end_date: String,
    pub category_breakdown: Vec<CategoryBucket>,
    pub totals: ReportTotals,
    pub transactions: Vec<FinancialRecord>,
}

fn num(row: &Row, col: &str) -> f64 {
    row.get_num(col).unwrap_or(0.0)
}

/// Fold (period, type, total) rows into a zero-filled bucket series.
fn fill_buckets(rows: &[Row], bucket_count: u32) -> Vec<PeriodBucket> {
    let mut buckets: Vec<PeriodBucket> = (1..=bucket_count)
        .map(|period| PeriodBucket {
            period,
            income: 0.0,
            expenses: 0.0,
            balance: 0.0,
        })
        .collect();

    for row in rows {
        let period = row.get_i64("period").unwrap_or(0);
        if period < 1 || period > bucket_count as i64 {
            continue;
        }
        let bucket = &mut buckets[(period - 1) as usize];
        match row.get_str("type") {
            Some("income") => bucket.income = num(row, "total"),
            Some("expense") => bucket.expenses = num(row, "total"),
            _ => {}
        }
    }

    for bucket in &mut buckets {
        bucket.balance = bucket.income - bucket.expenses;
    }
    buckets
}

fn totals_from(buckets: &[CategoryBucket]) -> ReportTotals {
    let total_income = buckets
        .iter()
        .filter(|b| b.record_type == "income")
        .map(|b| b.total)
        .sum::<f64>();
    let total_expenses = buckets
        .iter()
        .filter(|b| b.record_type == "expense")
        .map(|b| b.total)
        .sum::<f64>();
    ReportTotals {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(a), Some(b)) => b.signed_duration_since(a).num_days() as u32,
        _ => 31,
    }
}

impl FinanceService {
    pub fn yearly_report(&self, year: i32) -> Result<YearlyReport, ServiceError> {
        let rows = self.query(
            "SELECT month as period, type, COALESCE(SUM(amount), 0) as total \
             FROM financial_records WHERE year = ?1 GROUP BY month, type",
            &[Value::Integer(year as i64)],
        )?;
        let monthly_breakdown = fill_buckets(&rows, 12);

        let category_breakdown =
            self.category_breakdown("year = ?1", &[Value::Integer(year as i64)])?;
        let totals = totals_from(&category_breakdown);

        Ok(YearlyReport {
            year,
            monthly_breakdown,
            category_breakdown,
            totals,
        })
    }

    pub fn monthly_report(&self, year: i32, month: u32) -> Result<MonthlyReport, ServiceError> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::Validation("month must be 1-12".into()));
        }

        let args = [Value::Integer(year as i64), Value::Integer(month as i64)];
        let rows = self.query(
            "SELECT CAST(substr(date, 9, 2) AS INTEGER) as period, type, \
                    COALESCE(SUM(amount), 0) as total \
             FROM financial_records WHERE year = ?1 AND month = ?2 \
             GROUP BY period, type",
            &args,
        )?;
        let daily_breakdown = fill_buckets(&rows, days_in_month(year, month));

        let category_breakdown = self.category_breakdown("year = ?1 AND month = ?2", &args)?;
        let totals = totals_from(&category_breakdown);

        let tx_rows = self.query(
            "SELECT data FROM financial_records WHERE year = ?1 AND month = ?2 \
             ORDER BY date ASC",
            &args,
        )?;

        Ok(MonthlyReport {
            year,
            month,
            daily_breakdown,
            category_breakdown,
            totals,
            transactions: Self::rows_to_records(&tx_rows)?,
        })
    }

    pub fn custom_report(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<CustomReport, ServiceError> {
        for date in [start_date, end_date] {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(ServiceError::Validation("dates must be YYYY-MM-DD".into()));
            }
        }
        if start_date > end_date {
            return Err(ServiceError::Validation(
                "start_date must not be after end_date".into(),
            ));
        }

        let args = [
            Value::Text(start_date.to_string()),
            Value::Text(end_date.to_string()),
        ];
        let category_breakdown =
            self.category_breakdown("date >= ?1 AND date <= ?2", &args)?;
        let totals = totals_from(&category_breakdown);

        let tx_rows = self.query(
            "SELECT data FROM financial_records WHERE date >= ?1 AND date <= ?2 \
             ORDER BY date ASC",
            &args,
        )?;

        Ok(CustomReport {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            category_breakdown,
            totals,
            transactions: Self::rows_to_records(&tx_rows)?,
        })
    }

    fn category_breakdown(
        &self,
        where_sql: &str,
        args: &[Value],
    ) -> Result<Vec<CategoryBucket>, ServiceError> {
        let rows = self.query(
            &format!(
                "SELECT category, type, COALESCE(SUM(amount), 0) as total, \
                        COUNT(*) as cnt \
                 FROM financial_records WHERE {} \
                 GROUP BY category, type ORDER BY total DESC",
                where_sql
            ),
            args,
        )?;
        Ok(rows
            .iter()
            .map(|row| CategoryBucket {
                category: row.get_str("category").unwrap_or_default().to_string(),
                record_type: row.get_str("type").unwrap_or_default().to_string(),
                total: num(row, "total"),
                count: row.get_i64("cnt").unwrap_or(0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordCategory, RecordType};
    use crate::service::test_support::{add_record, test_service};

    #[test]
    fn empty_year_still_yields_twelve_zero_buckets() {
        let svc = test_service();
        let report = svc.yearly_report(2031).unwrap();
        assert_eq!(report.monthly_breakdown.len(), 12);
        for bucket in &report.monthly_breakdown {
            assert_eq!(bucket.income, 0.0);
            assert_eq!(bucket.expenses, 0.0);
            assert_eq!(bucket.balance, 0.0);
        }
        assert!(report.category_breakdown.is_empty());
        assert_eq!(report.totals.balance, 0.0);
    }

    #[test]
    fn yearly_report_buckets_by_month() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 1000.0, "2025-01-15");
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 500.0, "2025-01-20");
        add_record(&svc, RecordType::Expense, RecordCategory::Rent, 300.0, "2025-03-01");
        // Another year must not leak in.
        add_record(&svc, RecordType::Income, RecordCategory::Grants, 9999.0, "2024-06-01");

        let report = svc.yearly_report(2025).unwrap();
        assert_eq!(report.monthly_breakdown[0].income, 1500.0);
        assert_eq!(report.monthly_breakdown[0].balance, 1500.0);
        assert_eq!(report.monthly_breakdown[2].expenses, 300.0);
        assert_eq!(report.monthly_breakdown[2].balance, -300.0);
        assert_eq!(report.monthly_breakdown[5].income, 0.0);

        assert_eq!(report.totals.total_income, 1500.0);
        assert_eq!(report.totals.total_expenses, 300.0);
        assert_eq!(report.totals.balance, 1200.0);
    }

    #[test]
    fn monthly_report_zero_fills_every_day() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 200.0, "2025-02-10");

        let report = svc.monthly_report(2025, 2).unwrap();
        assert_eq!(report.daily_breakdown.len(), 28);
        assert_eq!(report.daily_breakdown[9].income, 200.0);
        assert_eq!(report.daily_breakdown[0].income, 0.0);
        assert_eq!(report.transactions.len(), 1);

        // Leap year February.
        let leap = svc.monthly_report(2024, 2).unwrap();
        assert_eq!(leap.daily_breakdown.len(), 29);

        assert!(svc.monthly_report(2025, 13).is_err());
    }

    #[test]
    fn custom_report_windows_inclusively() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 100.0, "2025-01-01");
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 200.0, "2025-01-31");
        add_record(&svc, RecordType::Expense, RecordCategory::Rent, 50.0, "2025-02-01");

        let report = svc.custom_report("2025-01-01", "2025-01-31").unwrap();
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.totals.total_income, 300.0);
        assert_eq!(report.totals.total_expenses, 0.0);

        assert!(svc.custom_report("2025-02-01", "2025-01-01").is_err());
        assert!(svc.custom_report("bad", "2025-01-01").is_err());
    }

    #[test]
    fn category_breakdown_splits_by_type() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 700.0, "2025-05-01");
        add_record(&svc, RecordType::Expense, RecordCategory::Events, 300.0, "2025-05-02");
        add_record(&svc, RecordType::Income, RecordCategory::EventFees, 150.0, "2025-05-03");

        let report = svc.yearly_report(2025).unwrap();
        assert_eq!(report.category_breakdown.len(), 3);
        assert_eq!(report.category_breakdown[0].category, "dues");
        assert_eq!(report.category_breakdown[0].total, 700.0);
    }
}
