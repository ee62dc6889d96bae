use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::Value;

use crate::model::{CreateDueType, DueType};
use crate::service::DuesService;

impl DuesService {
    pub fn create_due_type(&self, input: CreateDueType) -> Result<DueType, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("due type name cannot be empty".into()));
        }
        if input.default_amount <= 0.0 {
            return Err(ServiceError::Validation(
                "default amount must be greater than 0".into(),
            ));
        }

        let now = now_rfc3339();
        let due_type = DueType {
            id: new_id(),
            name: input.name,
            description: input.description,
            default_amount: input.default_amount,
            is_recurring: input.is_recurring,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "due_types",
            &due_type.id,
            &due_type,
            &[
                ("name", Value::Text(due_type.name.clone())),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict(format!("due type '{}' already exists", due_type.name))
            }
            other => other,
        })?;

        Ok(due_type)
    }

    pub fn get_due_type(&self, id: &str) -> Result<DueType, ServiceError> {
        self.get_record("due_types", id)
    }

    pub fn list_due_types(&self, params: &ListParams) -> Result<ListResult<DueType>, ServiceError> {
        let (items, total) = self.list_records("due_types", &[], params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    pub fn update_due_type(
        &self,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<DueType, ServiceError> {
        let current: DueType = self.get_record("due_types", id)?;
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

        let updated: DueType =
            serde_json::from_value(base).map_err(|e| ServiceError::Internal(e.to_string()))?;

        if updated.default_amount <= 0.0 {
            return Err(ServiceError::Validation(
                "default amount must be greater than 0".into(),
            ));
        }

        self.update_record(
            "due_types",
            id,
            &updated,
            &[
                ("name", Value::Text(updated.name.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        Ok(updated)
    }

    /// Delete a due type. Refused while dues reference it.
    pub fn delete_due_type(&self, id: &str) -> Result<(), ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT COUNT(*) as cnt FROM dues WHERE due_type_id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let referenced = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0);
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!(
                "due type is referenced by {} due(s) and cannot be deleted",
                referenced
            )));
        }

        self.delete_record("due_types", id)
    }
}
