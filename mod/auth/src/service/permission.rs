use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult};
use acpn_sql::Value;

use crate::model::{Action, AuditContext, CreatePermission, Permission, Resource};
use crate::service::{AuthError, AuthService};

impl AuthService {
    /// Create a new permission. The (resource, action) pair is
    /// compound-unique; a duplicate surfaces as `Conflict`.
    pub fn create_permission(
        &self,
        ctx: &AuditContext,
        input: CreatePermission,
    ) -> Result<Permission, AuthError> {
        if input.name.trim().is_empty() {
            return Err(AuthError::Validation("permission name cannot be empty".into()));
        }

        let now = now_rfc3339();
        let permission = Permission {
            id: new_id(),
            name: input.name,
            description: input.description,
            resource: input.resource,
            action: input.action,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "permissions",
            &permission.id,
            &permission,
            &[
                ("resource", Value::Text(permission.resource.as_str().into())),
                ("action", Value::Text(permission.action.as_str().into())),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => AuthError::Conflict(format!(
                "permission for {}:{} already exists",
                permission.resource, permission.action
            )),
            other => other,
        })?;

        self.record_audit(
            ctx,
            "permission.create",
            Resource::Permission,
            Some(&permission.id),
            serde_json::json!({ "after": &permission }),
        )?;

        Ok(permission)
    }

    /// Get a permission by id.
    pub fn get_permission(&self, id: &str) -> Result<Permission, AuthError> {
        self.get_record("permissions", id)
    }

    /// Find a permission by its (resource, action) pair.
    pub fn find_permission(
        &self,
        resource: Resource,
        action: Action,
    ) -> Result<Option<Permission>, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM permissions WHERE resource = ?1 AND action = ?2",
                &[
                    Value::Text(resource.as_str().into()),
                    Value::Text(action.as_str().into()),
                ],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match rows.first().and_then(|r| r.get_str("data")) {
            Some(data) => {
                let p = serde_json::from_str(data)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// List permissions with pagination, optionally filtered by resource.
    pub fn list_permissions(
        &self,
        params: &ListParams,
        resource: Option<Resource>,
    ) -> Result<ListResult<Permission>, AuthError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(r) = resource {
            f.push(("resource", Value::Text(r.as_str().into())));
        }
        let (items, total) =
            self.list_records("permissions", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Load permissions by id, preserving input order.
    pub(crate) fn permissions_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<Permission>, AuthError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> =
            (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT data FROM permissions WHERE id IN ({})",
            placeholders.join(", ")
        );
        let params: Vec<Value> = ids.iter().map(|id| Value::Text(id.clone())).collect();

        let rows = self
            .sql
            .query(&sql, &params)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut loaded = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                let p: Permission = serde_json::from_str(data)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                loaded.push(p);
            }
        }

        // Restore the role's declared ordering.
        loaded.sort_by_key(|p| ids.iter().position(|id| *id == p.id).unwrap_or(usize::MAX));
        Ok(loaded)
    }

    /// Update a permission's name/description with JSON merge-patch.
    /// The (resource, action) pair is immutable.
    pub fn update_permission(
        &self,
        ctx: &AuditContext,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Permission, AuthError> {
        let current: Permission = self.get_record("permissions", id)?;
        let before = serde_json::to_value(&current)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("resource");
            obj.remove("action");
            obj.remove("created_at");
        }

        let mut base = before.clone();
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let updated: Permission =
            serde_json::from_value(base).map_err(|e| AuthError::Internal(e.to_string()))?;

        self.update_record(
            "permissions",
            id,
            &updated,
            &[("updated_at", Value::Text(now))],
        )?;

        self.record_audit(
            ctx,
            "permission.update",
            Resource::Permission,
            Some(id),
            serde_json::json!({ "before": before, "after": &updated }),
        )?;

        Ok(updated)
    }

    /// Delete a permission and remove it from every role that carries it.
    pub fn delete_permission(&self, ctx: &AuditContext, id: &str) -> Result<(), AuthError> {
        let existing: Permission = self.get_record("permissions", id)?;

        // Drop the dangling reference from role permission lists.
        let roles = self.all_roles()?;
        for mut role in roles {
            if role.permission_ids.iter().any(|p| p == id) {
                role.permission_ids.retain(|p| p != id);
                role.updated_at = now_rfc3339();
                self.update_record(
                    "roles",
                    &role.id.clone(),
                    &role,
                    &[("updated_at", Value::Text(role.updated_at.clone()))],
                )?;
            }
        }

        self.delete_record("permissions", id)?;

        self.record_audit(
            ctx,
            "permission.delete",
            Resource::Permission,
            Some(id),
            serde_json::json!({ "before": existing }),
        )?;

        Ok(())
    }

    /// Seed the full resource × action permission catalog.
    ///
    /// Idempotent: existing (resource, action) pairs are left untouched.
    /// Appends exactly one audit entry per call.
    pub fn initialize_permissions(&self, ctx: &AuditContext) -> Result<usize, AuthError> {
        let mut created = 0usize;
        for resource in Resource::ALL {
            for action in Action::ALL {
                if self.find_permission(resource, action)?.is_some() {
                    continue;
                }
                let now = now_rfc3339();
                let permission = Permission {
                    id: new_id(),
                    name: format!("{}:{}", resource, action),
                    description: Some(format!("Allows {} on {}", action, resource)),
                    resource,
                    action,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };
                self.insert_record(
                    "permissions",
                    &permission.id,
                    &permission,
                    &[
                        ("resource", Value::Text(resource.as_str().into())),
                        ("action", Value::Text(action.as_str().into())),
                        ("created_at", Value::Text(now.clone())),
                        ("updated_at", Value::Text(now)),
                    ],
                )?;
                created += 1;
            }
        }

        self.record_audit(
            ctx,
            "permission.initialize",
            Resource::Permission,
            None,
            serde_json::json!({ "created": created }),
        )?;

        tracing::info!(created, "permission catalog initialized");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::test_service;

    #[test]
    fn catalog_is_full_cross_product_and_idempotent() {
        let svc = test_service();
        let ctx = AuditContext::system();

        let created = svc.initialize_permissions(&ctx).unwrap();
        assert_eq!(created, Resource::ALL.len() * Action::ALL.len());

        // Second run creates nothing new.
        let created_again = svc.initialize_permissions(&ctx).unwrap();
        assert_eq!(created_again, 0);

        let list = svc
            .list_permissions(
                &ListParams {
                    limit: 500,
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(list.total, 130);
    }

    #[test]
    fn duplicate_pair_is_conflict() {
        let svc = test_service();
        let ctx = AuditContext::system();

        svc.create_permission(
            &ctx,
            CreatePermission {
                name: "due:create".into(),
                description: None,
                resource: Resource::Due,
                action: Action::Create,
            },
        )
        .unwrap();

        let err = svc
            .create_permission(
                &ctx,
                CreatePermission {
                    name: "dup".into(),
                    description: None,
                    resource: Resource::Due,
                    action: Action::Create,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[test]
    fn delete_permission_scrubs_role_references() {
        let svc = test_service();
        let ctx = AuditContext::system();

        let p = svc
            .create_permission(
                &ctx,
                CreatePermission {
                    name: "poll:read".into(),
                    description: None,
                    resource: Resource::Poll,
                    action: Action::Read,
                },
            )
            .unwrap();

        let role = svc
            .create_role(
                &ctx,
                crate::model::CreateRole {
                    name: "observer".into(),
                    description: None,
                    permission_ids: vec![p.id.clone()],
                },
            )
            .unwrap();

        svc.delete_permission(&ctx, &p.id).unwrap();

        let reloaded = svc.get_role(&role.id).unwrap();
        assert!(reloaded.permission_ids.is_empty());
    }
}
