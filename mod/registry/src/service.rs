use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::{SQLStore, Value};

use crate::model::{CreatePharmacy, Pharmacy, RegistrationStatus};

/// Filters for pharmacy listing.
#[derive(Debug, Default)]
pub struct PharmacyFilters {
    pub registration_status: Option<RegistrationStatus>,
    pub user_id: Option<String>,
}

/// The pharmacy register. Holds the SQL store and provides CRUD plus the
/// lookups the dues engine needs (active set, ownership).
pub struct RegistryService {
    sql: Arc<dyn SQLStore>,
}

impl RegistryService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, ServiceError> {
        init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql }))
    }

    pub fn create_pharmacy(&self, input: CreatePharmacy) -> Result<Pharmacy, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("pharmacy name cannot be empty".into()));
        }
        if input.registration_number.trim().is_empty() {
            return Err(ServiceError::Validation(
                "registration number cannot be empty".into(),
            ));
        }

        let now = now_rfc3339();
        let pharmacy = Pharmacy {
            id: new_id(),
            name: input.name,
            registration_number: input.registration_number,
            registration_status: input
                .registration_status
                .unwrap_or(RegistrationStatus::Pending),
            user_id: input.user_id,
            email: input.email,
            phone: input.phone,
            address: input.address,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "pharmacies",
            &pharmacy.id,
            &pharmacy,
            &[
                ("name", Value::Text(pharmacy.name.clone())),
                (
                    "registration_number",
                    Value::Text(pharmacy.registration_number.clone()),
                ),
                (
                    "registration_status",
                    Value::Text(pharmacy.registration_status.as_str().into()),
                ),
                ("user_id", Value::Text(pharmacy.user_id.clone())),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                "registration number '{}' is already taken",
                pharmacy.registration_number
            )),
            other => other,
        })?;

        tracing::info!(pharmacy_id = %pharmacy.id, "pharmacy registered");
        Ok(pharmacy)
    }

    pub fn get_pharmacy(&self, id: &str) -> Result<Pharmacy, ServiceError> {
        self.get_record("pharmacies", id)
    }

    pub fn list_pharmacies(
        &self,
        params: &ListParams,
        filters: &PharmacyFilters,
    ) -> Result<ListResult<Pharmacy>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(status) = filters.registration_status {
            f.push(("registration_status", Value::Text(status.as_str().into())));
        }
        if let Some(ref uid) = filters.user_id {
            f.push(("user_id", Value::Text(uid.clone())));
        }
        let (items, total) =
            self.list_records("pharmacies", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// All pharmacies with active registration — the bulk-assignment
    /// target set.
    pub fn active_pharmacies(&self) -> Result<Vec<Pharmacy>, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM pharmacies WHERE registration_status = 'active' \
                 ORDER BY created_at",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let mut items = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                items.push(
                    serde_json::from_str(data)
                        .map_err(|e| ServiceError::Internal(e.to_string()))?,
                );
            }
        }
        Ok(items)
    }

    pub fn update_pharmacy(
        &self,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Pharmacy, ServiceError> {
        let current: Pharmacy = self.get_record("pharmacies", id)?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("created_at");
        }

        let mut base = serde_json::to_value(&current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let updated: Pharmacy =
            serde_json::from_value(base).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.update_record(
            "pharmacies",
            id,
            &updated,
            &[
                ("name", Value::Text(updated.name.clone())),
                (
                    "registration_number",
                    Value::Text(updated.registration_number.clone()),
                ),
                (
                    "registration_status",
                    Value::Text(updated.registration_status.as_str().into()),
                ),
                ("user_id", Value::Text(updated.user_id.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        Ok(updated)
    }

    pub fn set_registration_status(
        &self,
        id: &str,
        status: RegistrationStatus,
    ) -> Result<Pharmacy, ServiceError> {
        self.update_pharmacy(id, serde_json::json!({ "registration_status": status }))
    }

    pub fn delete_pharmacy(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record("pharmacies", id)
    }

    // ── Generic JSON-record CRUD helpers ──

    fn insert_record<T: Serialize>(
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

    fn get_record<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<T, ServiceError> {
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

    fn update_record<T: Serialize>(
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

        let affected = self.sql.exec(&sql, &params).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE constraint") {
                ServiceError::Conflict(msg)
            } else {
                ServiceError::Storage(msg)
            }
        })?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    fn delete_record(&self, table: &str, id: &str) -> Result<(), ServiceError> {
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

    fn list_records<T: DeserializeOwned>(
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

fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS pharmacies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            registration_number TEXT NOT NULL,
            registration_status TEXT NOT NULL,
            user_id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_pharmacies_regno
            ON pharmacies(registration_number)",
        "CREATE INDEX IF NOT EXISTS idx_pharmacies_status
            ON pharmacies(registration_status)",
        "CREATE INDEX IF NOT EXISTS idx_pharmacies_user ON pharmacies(user_id)",
    ];
    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpn_sql::SqliteStore;

    fn test_service() -> Arc<RegistryService> {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        RegistryService::new(sql).unwrap()
    }

    fn input(name: &str, regno: &str) -> CreatePharmacy {
        CreatePharmacy {
            name: name.into(),
            registration_number: regno.into(),
            user_id: "owner1".into(),
            registration_status: Some(RegistrationStatus::Active),
            email: None,
            phone: None,
            address: None,
        }
    }

    #[test]
    fn pharmacy_crud() {
        let svc = test_service();

        let ph = svc.create_pharmacy(input("HealthPlus", "ACPN-001")).unwrap();
        assert_eq!(ph.registration_status, RegistrationStatus::Active);

        let fetched = svc.get_pharmacy(&ph.id).unwrap();
        assert_eq!(fetched.name, "HealthPlus");

        let updated = svc
            .update_pharmacy(&ph.id, serde_json::json!({ "phone": "+2348000000" }))
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+2348000000"));

        svc.delete_pharmacy(&ph.id).unwrap();
        assert!(svc.get_pharmacy(&ph.id).is_err());
    }

    #[test]
    fn registration_number_is_unique() {
        let svc = test_service();
        svc.create_pharmacy(input("A", "ACPN-XYZ")).unwrap();
        let err = svc.create_pharmacy(input("B", "ACPN-XYZ")).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn active_set_excludes_other_statuses() {
        let svc = test_service();
        svc.create_pharmacy(input("A", "R1")).unwrap();
        svc.create_pharmacy(input("B", "R2")).unwrap();
        let mut c = input("C", "R3");
        c.registration_status = Some(RegistrationStatus::Suspended);
        svc.create_pharmacy(c).unwrap();
        let mut d = input("D", "R4");
        d.registration_status = None; // defaults to pending
        svc.create_pharmacy(d).unwrap();

        let active = svc.active_pharmacies().unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn status_transition() {
        let svc = test_service();
        let ph = svc.create_pharmacy(input("A", "R9")).unwrap();
        let ph = svc
            .set_registration_status(&ph.id, RegistrationStatus::Expired)
            .unwrap();
        assert_eq!(ph.registration_status, RegistrationStatus::Expired);
        assert!(svc.active_pharmacies().unwrap().is_empty());
    }
}
