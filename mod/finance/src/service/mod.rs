pub mod record;
pub mod report;

use std::sync::Arc;

use acpn_core::ServiceError;
use acpn_sql::{SQLStore, Value};

/// Finance service — the income/expense ledger over the SQL store.
pub struct FinanceService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

impl FinanceService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, ServiceError> {
        init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql }))
    }
}

fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    let statements = [
        // year/month are derived from the date at write time so reports
        // can aggregate on indexed integer columns.
        "CREATE TABLE IF NOT EXISTS financial_records (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            status TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_finrec_type ON financial_records(type)",
        "CREATE INDEX IF NOT EXISTS idx_finrec_category ON financial_records(category)",
        "CREATE INDEX IF NOT EXISTS idx_finrec_date ON financial_records(date)",
        "CREATE INDEX IF NOT EXISTS idx_finrec_year_month
            ON financial_records(year, month)",
    ];
    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
    }
    Ok(())
}

impl FinanceService {
    pub(crate) fn rows_to_records<T: serde::de::DeserializeOwned>(
        rows: &[acpn_sql::Row],
    ) -> Result<Vec<T>, ServiceError> {
        let mut items = Vec::new();
        for row in rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            items.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }
        Ok(items)
    }

    pub(crate) fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<acpn_sql::Row>, ServiceError> {
        self.sql
            .query(sql, params)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::{CreateRecord, FinancialRecord, RecordCategory, RecordType};
    use acpn_sql::SqliteStore;

    pub fn test_service() -> Arc<FinanceService> {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        FinanceService::new(sql).unwrap()
    }

    pub fn add_record(
        svc: &FinanceService,
        record_type: RecordType,
        category: RecordCategory,
        amount: f64,
        date: &str,
    ) -> FinancialRecord {
        svc.create_record(
            CreateRecord {
                record_type,
                category,
                amount,
                title: Some(format!("{} {}", category.as_str(), date)),
                description: None,
                date: date.into(),
                payment_method: None,
                status: None,
                attachments: vec![],
            },
            "treasurer1",
        )
        .unwrap()
    }
}
