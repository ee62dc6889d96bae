use chrono::Datelike;
use serde::Serialize;

use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::Value;

use crate::model::{CreateRecord, FinancialRecord, RecordCategory, RecordStatus, RecordType};
use crate::service::FinanceService;

/// Filters for ledger listing.
#[derive(Debug, Default)]
pub struct RecordFilters {
    pub record_type: Option<RecordType>,
    pub category: Option<RecordCategory>,
    pub status: Option<RecordStatus>,
    /// Inclusive `YYYY-MM-DD` bounds.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Income/expense totals over a window.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub record_count: i64,
}

fn parse_date(date: &str) -> Result<chrono::NaiveDate, ServiceError> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ServiceError::Validation("date must be YYYY-MM-DD".into()))
}

/// Map a requested sort to a whitelisted ORDER BY clause.
fn order_by(sort: Option<&str>) -> &'static str {
    match sort {
        Some("date") => "date ASC",
        Some("-date") | None => "date DESC",
        Some("amount") => "amount ASC",
        Some("-amount") => "amount DESC",
        Some("created_at") => "created_at ASC",
        Some("-created_at") => "created_at DESC",
        // Unknown sort keys fall back to the default rather than erroring.
        Some(_) => "date DESC",
    }
}

impl FinanceService {
    pub fn create_record(
        &self,
        input: CreateRecord,
        recorded_by: &str,
    ) -> Result<FinancialRecord, ServiceError> {
        if input.amount <= 0.0 {
            return Err(ServiceError::Validation("amount must be greater than 0".into()));
        }
        let date = parse_date(&input.date)?;

        let title = match (input.title, &input.description) {
            (Some(t), _) if !t.trim().is_empty() => t,
            (_, Some(d)) if !d.trim().is_empty() => d.clone(),
            _ => {
                return Err(ServiceError::Validation(
                    "either title or description is required".into(),
                ))
            }
        };

        let now = now_rfc3339();
        let record = FinancialRecord {
            id: new_id(),
            record_type: input.record_type,
            category: input.category,
            amount: input.amount,
            title,
            description: input.description,
            date: input.date,
            recorded_by: recorded_by.to_string(),
            payment_method: input.payment_method,
            status: input.status.unwrap_or(RecordStatus::Approved),
            attachments: input.attachments,
            created_at: now.clone(),
            updated_at: now,
        };

        self.insert_row(&record, date.year(), date.month() as i64)?;
        Ok(record)
    }

    pub fn get_record(&self, id: &str) -> Result<FinancialRecord, ServiceError> {
        let rows = self.query(
            "SELECT data FROM financial_records WHERE id = ?1",
            &[Value::Text(id.to_string())],
        )?;
        let data = rows
            .first()
            .and_then(|r| r.get_str("data"))
            .ok_or_else(|| ServiceError::NotFound(format!("financial record {}", id)))?;
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// List records with filters, free-text search, whitelisted sorting
    /// and pagination.
    pub fn list_records(
        &self,
        params: &ListParams,
        filters: &RecordFilters,
    ) -> Result<ListResult<FinancialRecord>, ServiceError> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        let mut idx = 0usize;
        let push = |clause: &str, value: Value, idx: &mut usize, args: &mut Vec<Value>| {
            *idx += 1;
            args.push(value);
            format!("{} ?{}", clause, idx)
        };

        if let Some(t) = filters.record_type {
            where_clauses.push(push("type =", Value::Text(t.as_str().into()), &mut idx, &mut args));
        }
        if let Some(c) = filters.category {
            where_clauses.push(push(
                "category =",
                Value::Text(c.as_str().into()),
                &mut idx,
                &mut args,
            ));
        }
        if let Some(s) = filters.status {
            where_clauses.push(push(
                "status =",
                Value::Text(s.as_str().into()),
                &mut idx,
                &mut args,
            ));
        }
        if let Some(ref from) = filters.start_date {
            where_clauses.push(push("date >=", Value::Text(from.clone()), &mut idx, &mut args));
        }
        if let Some(ref to) = filters.end_date {
            where_clauses.push(push("date <=", Value::Text(to.clone()), &mut idx, &mut args));
        }
        if let Some(ref q) = params.q {
            let like = format!("%{}%", q);
            idx += 2;
            args.push(Value::Text(like.clone()));
            args.push(Value::Text(like));
            where_clauses.push(format!(
                "(title LIKE ?{} OR description LIKE ?{})",
                idx - 1,
                idx
            ));
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let count_rows = self.query(
            &format!("SELECT COUNT(*) as cnt FROM financial_records{}", where_sql),
            &args,
        )?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let limit_idx = args.len() + 1;
        let offset_idx = args.len() + 2;
        args.push(Value::Integer(params.limit as i64));
        args.push(Value::Integer(params.offset as i64));

        let rows = self.query(
            &format!(
                "SELECT data FROM financial_records{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
                where_sql,
                order_by(params.sort.as_deref()),
                limit_idx,
                offset_idx,
            ),
            &args,
        )?;

        Ok(ListResult {
            items: Self::rows_to_records(&rows)?,
            total,
        })
    }

    pub fn update_record(
        &self,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<FinancialRecord, ServiceError> {
        let current = self.get_record(id)?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("recorded_by");
            obj.remove("created_at");
        }

        let mut base = serde_json::to_value(&current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let updated: FinancialRecord =
            serde_json::from_value(base).map_err(|e| ServiceError::Internal(e.to_string()))?;

        if updated.amount <= 0.0 {
            return Err(ServiceError::Validation("amount must be greater than 0".into()));
        }
        let date = parse_date(&updated.date)?;

        let json = serde_json::to_string(&updated)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let affected = self
            .sql
            .exec(
                "UPDATE financial_records SET data = ?1, type = ?2, category = ?3, \
                 amount = ?4, date = ?5, year = ?6, month = ?7, status = ?8, \
                 title = ?9, description = ?10, updated_at = ?11 WHERE id = ?12",
                &[
                    Value::Text(json),
                    Value::Text(updated.record_type.as_str().into()),
                    Value::Text(updated.category.as_str().into()),
                    Value::Real(updated.amount),
                    Value::Text(updated.date.clone()),
                    Value::Integer(date.year() as i64),
                    Value::Integer(date.month() as i64),
                    Value::Text(updated.status.as_str().into()),
                    Value::Text(updated.title.clone()),
                    updated
                        .description
                        .clone()
                        .map(Value::Text)
                        .unwrap_or(Value::Null),
                    Value::Text(now),
                    Value::Text(id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("financial record {}", id)));
        }

        Ok(updated)
    }

    pub fn delete_record(&self, id: &str) -> Result<(), ServiceError> {
        let affected = self
            .sql
            .exec(
                "DELETE FROM financial_records WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("financial record {}", id)));
        }
        Ok(())
    }

    /// Totals over an optional inclusive date window.
    pub fn summary(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<LedgerSummary, ServiceError> {
        let mut where_clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(from) = start_date {
            args.push(Value::Text(from.to_string()));
            where_clauses.push(format!("date >= ?{}", args.len()));
        }
        if let Some(to) = end_date {
            args.push(Value::Text(to.to_string()));
            where_clauses.push(format!("date <= ?{}", args.len()));
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let rows = self.query(
            &format!(
                "SELECT COUNT(*) as cnt, \
                 COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE 0 END), 0) as income, \
                 COALESCE(SUM(CASE WHEN type = 'expense' THEN amount ELSE 0 END), 0) as expenses \
                 FROM financial_records{}",
                where_sql
            ),
            &args,
        )?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::Internal("empty aggregate result".into()))?;

        let total_income = row.get_num("income").unwrap_or(0.0);
        let total_expenses = row.get_num("expenses").unwrap_or(0.0);
        Ok(LedgerSummary {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
            record_count: row.get_i64("cnt").unwrap_or(0),
        })
    }

    fn insert_row(
        &self,
        record: &FinancialRecord,
        year: i32,
        month: i64,
    ) -> Result<(), ServiceError> {
        let json =
            serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.sql
            .exec(
                "INSERT INTO financial_records \
                 (id, data, type, category, amount, date, year, month, status, title, \
                  description, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                &[
                    Value::Text(record.id.clone()),
                    Value::Text(json),
                    Value::Text(record.record_type.as_str().into()),
                    Value::Text(record.category.as_str().into()),
                    Value::Real(record.amount),
                    Value::Text(record.date.clone()),
                    Value::Integer(year as i64),
                    Value::Integer(month),
                    Value::Text(record.status.as_str().into()),
                    Value::Text(record.title.clone()),
                    record
                        .description
                        .clone()
                        .map(Value::Text)
                        .unwrap_or(Value::Null),
                    Value::Text(record.created_at.clone()),
                    Value::Text(record.updated_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{add_record, test_service};

    #[test]
    fn create_requires_positive_amount_and_valid_date() {
        let svc = test_service();

        let bad_amount = svc.create_record(
            CreateRecord {
                record_type: RecordType::Income,
                category: RecordCategory::Dues,
                amount: 0.0,
                title: Some("x".into()),
                description: None,
                date: "2025-01-01".into(),
                payment_method: None,
                status: None,
                attachments: vec![],
            },
            "t1",
        );
        assert!(matches!(bad_amount.unwrap_err(), ServiceError::Validation(_)));

        let bad_date = svc.create_record(
            CreateRecord {
                record_type: RecordType::Income,
                category: RecordCategory::Dues,
                amount: 10.0,
                title: Some("x".into()),
                description: None,
                date: "01/01/2025".into(),
                payment_method: None,
                status: None,
                attachments: vec![],
            },
            "t1",
        );
        assert!(matches!(bad_date.unwrap_err(), ServiceError::Validation(_)));
    }

    #[test]
    fn title_defaults_to_description() {
        let svc = test_service();
        let record = svc
            .create_record(
                CreateRecord {
                    record_type: RecordType::Expense,
                    category: RecordCategory::Utilities,
                    amount: 120.0,
                    title: None,
                    description: Some("March electricity".into()),
                    date: "2025-03-05".into(),
                    payment_method: None,
                    status: None,
                    attachments: vec![],
                },
                "t1",
            )
            .unwrap();
        assert_eq!(record.title, "March electricity");
        assert_eq!(record.status, RecordStatus::Approved);
    }

    #[test]
    fn filtering_search_and_sort() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 1000.0, "2025-01-10");
        add_record(&svc, RecordType::Income, RecordCategory::Grants, 5000.0, "2025-02-10");
        add_record(&svc, RecordType::Expense, RecordCategory::Rent, 750.0, "2025-01-20");

        // Filter by type.
        let incomes = svc
            .list_records(
                &ListParams::default(),
                &RecordFilters {
                    record_type: Some(RecordType::Income),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(incomes.total, 2);

        // Date range.
        let january = svc
            .list_records(
                &ListParams::default(),
                &RecordFilters {
                    start_date: Some("2025-01-01".into()),
                    end_date: Some("2025-01-31".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(january.total, 2);

        // Free-text search hits the generated title.
        let grants = svc
            .list_records(
                &ListParams {
                    q: Some("grants".into()),
                    ..Default::default()
                },
                &RecordFilters::default(),
            )
            .unwrap();
        assert_eq!(grants.total, 1);

        // Ascending amount sort.
        let by_amount = svc
            .list_records(
                &ListParams {
                    sort: Some("amount".into()),
                    ..Default::default()
                },
                &RecordFilters::default(),
            )
            .unwrap();
        assert_eq!(by_amount.items[0].amount, 750.0);
        assert_eq!(by_amount.items[2].amount, 5000.0);
    }

    #[test]
    fn update_revalidates_amount() {
        let svc = test_service();
        let record = add_record(&svc, RecordType::Income, RecordCategory::Dues, 100.0, "2025-01-10");

        let err = svc
            .update_record(&record.id, serde_json::json!({ "amount": -3.0 }))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let updated = svc
            .update_record(&record.id, serde_json::json!({ "amount": 250.0, "date": "2025-04-01" }))
            .unwrap();
        assert_eq!(updated.amount, 250.0);

        // The derived month column follows the new date.
        let april = svc
            .list_records(
                &ListParams::default(),
                &RecordFilters {
                    start_date: Some("2025-04-01".into()),
                    end_date: Some("2025-04-30".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(april.total, 1);
    }

    #[test]
    fn summary_balances() {
        let svc = test_service();
        add_record(&svc, RecordType::Income, RecordCategory::Dues, 1000.0, "2025-01-10");
        add_record(&svc, RecordType::Expense, RecordCategory::Rent, 400.0, "2025-01-20");

        let all = svc.summary(None, None).unwrap();
        assert_eq!(all.total_income, 1000.0);
        assert_eq!(all.total_expenses, 400.0);
        assert_eq!(all.balance, 600.0);
        assert_eq!(all.record_count, 2);

        let empty = svc.summary(Some("2030-01-01"), Some("2030-12-31")).unwrap();
        assert_eq!(empty.balance, 0.0);
        assert_eq!(empty.record_count, 0);
    }
}
