pub mod analytics;
pub mod assign;
pub mod due;
pub mod due_type;
pub mod payment;
pub mod penalty;
pub mod schema;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use acpn_core::ServiceError;
use acpn_sql::{SQLStore, Value};
use registry::service::RegistryService;

/// Dues service — holds the SQL store plus the pharmacy register it
/// validates assignments and ownership against.
pub struct DuesService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) registry: Arc<RegistryService>,
}

impl DuesService {
    pub fn new(
        sql: Arc<dyn SQLStore>,
        registry: Arc<RegistryService>,
    ) -> Result<Arc<Self>, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, registry }))
    }

    /// The pharmacy register this service validates against.
    pub fn registry(&self) -> &Arc<RegistryService> {
        &self.registry
    }

    // ── Generic JSON-record CRUD helpers ──

    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json =
            serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            cols.push(col);
            placeholders.push(format!("?{}", i + 3));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                ServiceError::Conflict(msg)
            } else {
                ServiceError::Storage(msg)
            }
        })?;

        Ok(())
    }

    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, ServiceError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self
            .sql
            .query(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", table, id)))?;
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
    }

    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json =
            serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            sets.push(format!("{} = ?{}", col, i + 2));
            params.push(val.clone());
        }

        let id_idx = params.len() + 1;
        params.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE {} SET {} WHERE id = ?{}", table, sets.join(", "), id_idx);

        let affected = self
            .sql
            .exec(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), ServiceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self
            .sql
            .exec(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    pub(crate) fn list_records<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, Value)],
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<T>, usize), ServiceError> {
        let mut where_clauses = Vec::new();
        let mut params = Vec::new();

        for (i, (col, val)) in filters.iter().enumerate() {
            where_clauses.push(format!("{} = ?{}", col, i + 1));
            params.push(val.clone());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM {}{}", table, where_sql);
        let count_rows = self
            .sql
            .query(&count_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            table, where_sql, limit_idx, offset_idx,
        );

        let rows = self
            .sql
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            items.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }

        Ok((items, total))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use acpn_sql::SqliteStore;
    use registry::model::{CreatePharmacy, Pharmacy, RegistrationStatus};

    pub fn test_service() -> Arc<DuesService> {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let registry = RegistryService::new(Arc::clone(&sql)).unwrap();
        DuesService::new(sql, registry).unwrap()
    }

    pub fn add_pharmacy(svc: &DuesService, name: &str, active: bool) -> Pharmacy {
        svc.registry
            .create_pharmacy(CreatePharmacy {
                name: name.into(),
                registration_number: format!("RN-{}", name),
                user_id: format!("owner-{}", name),
                registration_status: Some(if active {
                    RegistrationStatus::Active
                } else {
                    RegistrationStatus::Suspended
                }),
                email: None,
                phone: None,
                address: None,
            })
            .unwrap()
    }

    pub fn add_due_type(svc: &DuesService, name: &str) -> crate::model::DueType {
        svc.create_due_type(crate::model::CreateDueType {
            name: name.into(),
            description: None,
            default_amount: 1000.0,
            is_recurring: true,
        })
        .unwrap()
    }
}
