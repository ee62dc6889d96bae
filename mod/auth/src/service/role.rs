use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult};
use acpn_sql::Value;

use crate::model::{AuditContext, CreateRole, Resource, Role, User};
use crate::service::{AuthError, AuthService};

impl AuthService {
    /// Create a custom role. Role names are unique.
    pub fn create_role(&self, ctx: &AuditContext, input: CreateRole) -> Result<Role, AuthError> {
        if input.name.trim().is_empty() {
            return Err(AuthError::Validation("role name cannot be empty".into()));
        }

        // Referenced permissions must exist.
        let found = self.permissions_by_ids(&input.permission_ids)?;
        if found.len() != input.permission_ids.len() {
            return Err(AuthError::Validation(
                "role references unknown permission ids".into(),
            ));
        }

        let now = now_rfc3339();
        let role = Role {
            id: new_id(),
            name: input.name,
            description: input.description,
            permission_ids: input.permission_ids,
            is_default: false,
            is_active: true,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            "roles",
            &role.id,
            &role,
            &[
                ("name", Value::Text(role.name.clone())),
                ("is_default", Value::Integer(0)),
                ("is_active", Value::Integer(1)),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            AuthError::Conflict(_) => {
                AuthError::Conflict(format!("role '{}' already exists", role.name))
            }
            other => other,
        })?;

        self.record_audit(
            ctx,
            "role.create",
            Resource::Role,
            Some(&role.id),
            serde_json::json!({ "after": &role }),
        )?;

        Ok(role)
    }

    /// Get a role by id.
    pub fn get_role(&self, id: &str) -> Result<Role, AuthError> {
        self.get_record("roles", id)
    }

    /// Get a role by its unique name.
    pub fn get_role_by_name(&self, name: &str) -> Result<Role, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM roles WHERE name = ?1",
                &[Value::Text(name.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let data = rows
            .first()
            .and_then(|r| r.get_str("data"))
            .ok_or_else(|| AuthError::NotFound(format!("role '{}' not found", name)))?;
        serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// All roles, unpaginated (the set is small).
    pub(crate) fn all_roles(&self) -> Result<Vec<Role>, AuthError> {
        let rows = self
            .sql
            .query("SELECT data FROM roles ORDER BY created_at", &[])
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let mut roles = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                roles.push(
                    serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?,
                );
            }
        }
        Ok(roles)
    }

    /// List roles with pagination.
    pub fn list_roles(&self, params: &ListParams) -> Result<ListResult<Role>, AuthError> {
        let (items, total) = self.list_records("roles", &[], params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Update a role with JSON merge-patch.
    ///
    /// Default roles are protected: they cannot be renamed or deactivated.
    pub fn update_role(
        &self,
        ctx: &AuditContext,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Role, AuthError> {
        let current: Role = self.get_record("roles", id)?;
        let before =
            serde_json::to_value(&current).map_err(|e| AuthError::Internal(e.to_string()))?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("is_default");
            obj.remove("created_at");
        }

        let mut base = before.clone();
        merge_patch(&mut base, &patch);
        base["updated_at"] = serde_json::json!(now);

        let updated: Role =
            serde_json::from_value(base).map_err(|e| AuthError::Internal(e.to_string()))?;

        if current.is_default && updated.name != current.name {
            return Err(AuthError::Validation(format!(
                "default role '{}' cannot be renamed",
                current.name
            )));
        }
        if current.is_default && !updated.is_active {
            return Err(AuthError::Validation(format!(
                "default role '{}' cannot be deactivated",
                current.name
            )));
        }

        let found = self.permissions_by_ids(&updated.permission_ids)?;
        if found.len() != updated.permission_ids.len() {
            return Err(AuthError::Validation(
                "role references unknown permission ids".into(),
            ));
        }

        self.update_record(
            "roles",
            id,
            &updated,
            &[
                ("name", Value::Text(updated.name.clone())),
                ("is_active", Value::Integer(if updated.is_active { 1 } else { 0 })),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        self.record_audit(
            ctx,
            "role.update",
            Resource::Role,
            Some(id),
            serde_json::json!({ "before": before, "after": &updated }),
        )?;

        Ok(updated)
    }

    /// Delete a role.
    ///
    /// Default roles can never be deleted; custom roles only when no user
    /// references them.
    pub fn delete_role(&self, ctx: &AuditContext, id: &str) -> Result<(), AuthError> {
        let role: Role = self.get_record("roles", id)?;

        if role.is_default {
            return Err(AuthError::Validation(format!(
                "default role '{}' cannot be deleted",
                role.name
            )));
        }

        let referenced = self.count_users_with_role(&role.name)?;
        if referenced > 0 {
            return Err(AuthError::Conflict(format!(
                "role '{}' is assigned to {} user(s) and cannot be deleted",
                role.name, referenced
            )));
        }

        self.delete_record("roles", id)?;

        self.record_audit(
            ctx,
            "role.delete",
            Resource::Role,
            Some(id),
            serde_json::json!({ "before": role }),
        )?;

        Ok(())
    }

    /// Append a permission to a role's grant list.
    pub fn add_role_permission(
        &self,
        ctx: &AuditContext,
        role_id: &str,
        permission_id: &str,
    ) -> Result<Role, AuthError> {
        let _permission = self.get_permission(permission_id)?;
        let mut role: Role = self.get_record("roles", role_id)?;

        if role.permission_ids.iter().any(|p| p == permission_id) {
            return Err(AuthError::Conflict(
                "role already holds this permission".into(),
            ));
        }

        let before =
            serde_json::to_value(&role).map_err(|e| AuthError::Internal(e.to_string()))?;
        role.permission_ids.push(permission_id.to_string());
        role.updated_at = now_rfc3339();

        self.update_record(
            "roles",
            role_id,
            &role,
            &[("updated_at", Value::Text(role.updated_at.clone()))],
        )?;

        self.record_audit(
            ctx,
            "role.permission.add",
            Resource::Role,
            Some(role_id),
            serde_json::json!({ "before": before, "after": &role }),
        )?;

        Ok(role)
    }

    /// Remove a permission from a role's grant list.
    pub fn remove_role_permission(
        &self,
        ctx: &AuditContext,
        role_id: &str,
        permission_id: &str,
    ) -> Result<Role, AuthError> {
        let mut role: Role = self.get_record("roles", role_id)?;

        if !role.permission_ids.iter().any(|p| p == permission_id) {
            return Err(AuthError::NotFound(
                "role does not hold this permission".into(),
            ));
        }

        let before =
            serde_json::to_value(&role).map_err(|e| AuthError::Internal(e.to_string()))?;
        role.permission_ids.retain(|p| p != permission_id);
        role.updated_at = now_rfc3339();

        self.update_record(
            "roles",
            role_id,
            &role,
            &[("updated_at", Value::Text(role.updated_at.clone()))],
        )?;

        self.record_audit(
            ctx,
            "role.permission.remove",
            Resource::Role,
            Some(role_id),
            serde_json::json!({ "before": before, "after": &role }),
        )?;

        Ok(role)
    }

    /// Users currently assigned a role (by role id).
    pub fn users_for_role(&self, role_id: &str) -> Result<Vec<User>, AuthError> {
        let role: Role = self.get_record("roles", role_id)?;
        let rows = self
            .sql
            .query(
                "SELECT data FROM users WHERE role = ?1 ORDER BY created_at DESC",
                &[Value::Text(role.name)],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        let mut users = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                users.push(
                    serde_json::from_str(data).map_err(|e| AuthError::Internal(e.to_string()))?,
                );
            }
        }
        Ok(users)
    }

    /// Count users referencing a role name.
    pub(crate) fn count_users_with_role(&self, role_name: &str) -> Result<i64, AuthError> {
        let rows = self
            .sql
            .query(
                "SELECT COUNT(*) as cnt FROM users WHERE role = ?1",
                &[Value::Text(role_name.to_string())],
            )
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, CreatePermission};
    use crate::service::test_support::test_service;

    #[test]
    fn role_crud_with_permission_validation() {
        let svc = test_service();
        let ctx = AuditContext::system();

        let p = svc
            .create_permission(
                &ctx,
                CreatePermission {
                    name: "event:read".into(),
                    description: None,
                    resource: Resource::Event,
                    action: Action::Read,
                },
            )
            .unwrap();

        // Unknown permission id rejected.
        let err = svc.create_role(
            &ctx,
            CreateRole {
                name: "events_team".into(),
                description: None,
                permission_ids: vec!["nope".into()],
            },
        );
        assert!(matches!(err.unwrap_err(), AuthError::Validation(_)));

        let role = svc
            .create_role(
                &ctx,
                CreateRole {
                    name: "events_team".into(),
                    description: Some("Event planners".into()),
                    permission_ids: vec![p.id.clone()],
                },
            )
            .unwrap();
        assert!(!role.is_default);

        // Duplicate name is a conflict.
        let dup = svc.create_role(
            &ctx,
            CreateRole {
                name: "events_team".into(),
                description: None,
                permission_ids: vec![],
            },
        );
        assert!(matches!(dup.unwrap_err(), AuthError::Conflict(_)));

        // Lookup by name.
        let by_name = svc.get_role_by_name("events_team").unwrap();
        assert_eq!(by_name.id, role.id);

        // Delete works while unreferenced.
        svc.delete_role(&ctx, &role.id).unwrap();
        assert!(svc.get_role(&role.id).is_err());
    }

    #[test]
    fn add_and_remove_role_permissions() {
        let svc = test_service();
        let ctx = AuditContext::system();

        let p1 = svc
            .create_permission(
                &ctx,
                CreatePermission {
                    name: "poll:create".into(),
                    description: None,
                    resource: Resource::Poll,
                    action: Action::Create,
                },
            )
            .unwrap();

        let role = svc
            .create_role(
                &ctx,
                CreateRole {
                    name: "pollsters".into(),
                    description: None,
                    permission_ids: vec![],
                },
            )
            .unwrap();

        let role = svc.add_role_permission(&ctx, &role.id, &p1.id).unwrap();
        assert_eq!(role.permission_ids, vec![p1.id.clone()]);

        // Adding twice conflicts.
        assert!(matches!(
            svc.add_role_permission(&ctx, &role.id, &p1.id).unwrap_err(),
            AuthError::Conflict(_)
        ));

        let role = svc.remove_role_permission(&ctx, &role.id, &p1.id).unwrap();
        assert!(role.permission_ids.is_empty());

        // Removing a permission the role doesn't hold is NotFound.
        assert!(matches!(
            svc.remove_role_permission(&ctx, &role.id, &p1.id).unwrap_err(),
            AuthError::NotFound(_)
        ));
    }
}
