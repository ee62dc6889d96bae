use acpn_core::{new_id, now_rfc3339, ListParams, ListResult};
use acpn_sql::Value;

use crate::model::{AuditContext, AuditEntry, Resource};
use crate::service::{AuthError, AuthService};

/// Filters for audit trail listing.
#[derive(Debug, Default)]
pub struct AuditFilters {
    pub user_id: Option<String>,
    pub resource_type: Option<String>,
}

impl AuthService {
    /// Append one audit entry. Failures are surfaced — a privileged
    /// mutation without its audit record is treated as a failed mutation.
    pub(crate) fn record_audit(
        &self,
        ctx: &AuditContext,
        action: &str,
        resource_type: Resource,
        resource_id: Option<&str>,
        details: serde_json::Value,
    ) -> Result<(), AuthError> {
        let entry = AuditEntry {
            id: new_id(),
            user_id: ctx.actor_id.clone(),
            action: action.to_string(),
            resource_type: resource_type.as_str().to_string(),
            resource_id: resource_id.map(str::to_string),
            details: Some(details),
            ip_address: ctx.ip_address.clone(),
            created_at: now_rfc3339(),
        };

        let mut indexes: Vec<(&str, Value)> = vec![
            ("user_id", Value::Text(entry.user_id.clone())),
            ("action", Value::Text(entry.action.clone())),
            ("resource_type", Value::Text(entry.resource_type.clone())),
            ("created_at", Value::Text(entry.created_at.clone())),
        ];
        if let Some(ref rid) = entry.resource_id {
            indexes.push(("resource_id", Value::Text(rid.clone())));
        }

        self.insert_record("audit_trail", &entry.id, &entry, &indexes)
    }

    /// List audit entries, newest first.
    pub fn list_audit_trail(
        &self,
        params: &ListParams,
        filters: &AuditFilters,
    ) -> Result<ListResult<AuditEntry>, AuthError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref uid) = filters.user_id {
            f.push(("user_id", Value::Text(uid.clone())));
        }
        if let Some(ref rt) = filters.resource_type {
            f.push(("resource_type", Value::Text(rt.clone())));
        }
        let (items, total) =
            self.list_records("audit_trail", &f, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::test_service;

    #[test]
    fn audit_entries_accumulate_and_filter() {
        let svc = test_service();
        let ctx = AuditContext::system();

        svc.record_audit(&ctx, "role.create", Resource::Role, Some("r1"), serde_json::json!({}))
            .unwrap();
        svc.record_audit(&ctx, "user.approve", Resource::User, Some("u1"), serde_json::json!({}))
            .unwrap();

        let all = svc
            .list_audit_trail(&ListParams::default(), &AuditFilters::default())
            .unwrap();
        assert_eq!(all.total, 2);

        let roles_only = svc
            .list_audit_trail(
                &ListParams::default(),
                &AuditFilters {
                    resource_type: Some("role".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(roles_only.total, 1);
        assert_eq!(roles_only.items[0].action, "role.create");
    }
}
