//! The authorization engine: role → permission resolution with superadmin
//! bypass, plus default-role initialization and the
//! [`acpn_core::Authenticator`] implementation consumed by other modules.

use axum::http::HeaderMap;

use acpn_core::{new_id, now_rfc3339, Authenticator, Identity, ServiceError, UserRole};
use acpn_sql::Value;

use crate::model::{Action, AuditContext, Resource, Role, User};
use crate::service::{AuthError, AuthService};

/// The curated permission grants for a default role.
///
/// Superadmin holds everything (and bypasses checks anyway); admin holds
/// everything except deleting roles/permissions; the officer roles hold
/// full control of their domains plus read on everything; members hold
/// read only.
pub fn default_role_grants(role: UserRole) -> Vec<(Resource, Action)> {
    fn grant_all_on(grants: &mut Vec<(Resource, Action)>, resources: &[Resource]) {
        for &r in resources {
            for a in Action::ALL {
                grants.push((r, a));
            }
        }
    }
    fn grant_all_reads(grants: &mut Vec<(Resource, Action)>) {
        for r in Resource::ALL {
            grants.push((r, Action::Read));
        }
    }

    let mut grants: Vec<(Resource, Action)> = Vec::new();

    match role {
        UserRole::Superadmin => grant_all_on(&mut grants, &Resource::ALL),
        UserRole::Admin => {
            grant_all_on(&mut grants, &Resource::ALL);
            grants.retain(|&(r, a)| {
                !(a == Action::Delete && matches!(r, Resource::Role | Resource::Permission))
            });
        }
        UserRole::Secretary => {
            grant_all_on(
                &mut grants,
                &[Resource::Document, Resource::Communication, Resource::Event],
            );
            grant_all_reads(&mut grants);
        }
        UserRole::Treasurer => {
            grant_all_on(&mut grants, &[Resource::FinancialRecord, Resource::Donation]);
            grant_all_reads(&mut grants);
        }
        UserRole::FinancialSecretary => {
            grant_all_on(
                &mut grants,
                &[Resource::FinancialRecord, Resource::Due, Resource::Donation],
            );
            grant_all_reads(&mut grants);
        }
        UserRole::Member => grant_all_reads(&mut grants),
    }

    // Overlapping grant sets (e.g. document:read from both the domain
    // grant and the read sweep) collapse to one entry, first wins.
    let mut seen = std::collections::HashSet::new();
    grants.retain(|pair| seen.insert(*pair));
    grants
}

fn default_role_description(role: UserRole) -> &'static str {
    match role {
        UserRole::Superadmin => "Full access to every resource; bypasses permission checks",
        UserRole::Admin => "Administers the association; cannot delete roles or permissions",
        UserRole::Secretary => "Manages documents, communications and events",
        UserRole::Treasurer => "Manages financial records and donations",
        UserRole::FinancialSecretary => "Manages financial records, dues and donations",
        UserRole::Member => "Read-only access",
    }
}

impl AuthService {
    /// Resolve "can `role` perform `action` on `resource`".
    ///
    /// Superadmin is unconditionally allowed. Otherwise the Role document
    /// matching the role name is loaded (`NotFound` if missing — a
    /// configuration error distinct from "lacks permission") and its
    /// permission list checked for an exact (resource, action) match.
    pub fn has_permission(
        &self,
        role: UserRole,
        resource: Resource,
        action: Action,
    ) -> Result<bool, AuthError> {
        if role == UserRole::Superadmin {
            return Ok(true);
        }

        let role_doc: Role = self.get_role_by_name(role.as_str())?;
        if !role_doc.is_active {
            return Ok(false);
        }

        let permissions = self.permissions_by_ids(&role_doc.permission_ids)?;
        Ok(permissions
            .iter()
            .any(|p| p.resource == resource && p.action == action))
    }

    /// True iff `has_permission` holds for at least one pair.
    pub fn has_any_permission(
        &self,
        role: UserRole,
        pairs: &[(Resource, Action)],
    ) -> Result<bool, AuthError> {
        for &(resource, action) in pairs {
            if self.has_permission(role, resource, action)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True iff `has_permission` holds for every pair.
    pub fn has_all_permissions(
        &self,
        role: UserRole,
        pairs: &[(Resource, Action)],
    ) -> Result<bool, AuthError> {
        for &(resource, action) in pairs {
            if !self.has_permission(role, resource, action)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Seed or reset the six default roles.
    ///
    /// Ensures the permission catalog exists, then upserts each default
    /// role to its curated definition. An existing role's description and
    /// permission set are overwritten — initialization is a deliberate
    /// reset-to-default, not additive. Idempotent; appends exactly one
    /// audit entry per call.
    pub fn initialize_roles(&self, ctx: &AuditContext) -> Result<(), AuthError> {
        self.initialize_permissions(ctx)?;

        for role in UserRole::ALL {
            let grants = default_role_grants(role);
            let mut permission_ids = Vec::with_capacity(grants.len());
            for (resource, action) in grants {
                let permission = self.find_permission(resource, action)?.ok_or_else(|| {
                    AuthError::Internal(format!(
                        "permission {}:{} missing after initialization",
                        resource, action
                    ))
                })?;
                permission_ids.push(permission.id);
            }

            let now = now_rfc3339();
            match self.get_role_by_name(role.as_str()) {
                Ok(mut existing) => {
                    existing.description = Some(default_role_description(role).to_string());
                    existing.permission_ids = permission_ids;
                    existing.is_default = true;
                    existing.is_active = true;
                    existing.updated_at = now.clone();
                    self.update_record(
                        "roles",
                        &existing.id.clone(),
                        &existing,
                        &[
                            ("is_default", Value::Integer(1)),
                            ("is_active", Value::Integer(1)),
                            ("updated_at", Value::Text(now)),
                        ],
                    )?;
                }
                Err(AuthError::NotFound(_)) => {
                    let record = Role {
                        id: new_id(),
                        name: role.as_str().to_string(),
                        description: Some(default_role_description(role).to_string()),
                        permission_ids,
                        is_default: true,
                        is_active: true,
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    };
                    self.insert_record(
                        "roles",
                        &record.id,
                        &record,
                        &[
                            ("name", Value::Text(record.name.clone())),
                            ("is_default", Value::Integer(1)),
                            ("is_active", Value::Integer(1)),
                            ("created_at", Value::Text(now.clone())),
                            ("updated_at", Value::Text(now)),
                        ],
                    )?;
                }
                Err(other) => return Err(other),
            }
        }

        self.record_audit(
            ctx,
            "role.initialize",
            Resource::Role,
            None,
            serde_json::json!({ "roles": UserRole::ALL.map(|r| r.as_str()) }),
        )?;

        tracing::info!("default roles initialized");
        Ok(())
    }
}

/// Extract the Bearer token from the Authorization header.
pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

impl Authenticator for AuthService {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, ServiceError> {
        let token = extract_bearer(headers)
            .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;

        let claims = self.verify_token(token).map_err(ServiceError::from)?;

        let user: User = self
            .get_record("users", &claims.sub)
            .map_err(|_| ServiceError::Unauthorized("user no longer exists".into()))?;

        if !user.can_authenticate() {
            return Err(ServiceError::Unauthorized(format!(
                "account is {} and cannot authenticate",
                user.status.as_str()
            )));
        }

        Ok(Identity {
            user_id: user.id,
            name: user.name,
            role: user.role,
        })
    }

    fn check_permission(
        &self,
        identity: &Identity,
        resource: &str,
        action: &str,
    ) -> Result<(), ServiceError> {
        let resource: Resource = resource.parse()?;
        let action: Action = action.parse()?;

        if self
            .has_permission(identity.role, resource, action)
            .map_err(ServiceError::from)?
        {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "role '{}' lacks permission {}:{}",
                identity.role, resource, action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::test_service;

    #[test]
    fn superadmin_bypasses_even_without_roles() {
        let svc = test_service();
        // No initialization at all: superadmin is still allowed.
        for resource in Resource::ALL {
            for action in Action::ALL {
                assert!(svc
                    .has_permission(UserRole::Superadmin, resource, action)
                    .unwrap());
            }
        }
    }

    #[test]
    fn missing_role_document_is_not_found() {
        let svc = test_service();
        let err = svc
            .has_permission(UserRole::Member, Resource::Due, Action::Read)
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[test]
    fn default_member_is_read_only() {
        let svc = test_service();
        svc.initialize_roles(&AuditContext::system()).unwrap();

        assert!(svc
            .has_permission(UserRole::Member, Resource::Due, Action::Read)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Member, Resource::Due, Action::Delete)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Member, Resource::Document, Action::Create)
            .unwrap());
    }

    #[test]
    fn admin_cannot_delete_roles_or_permissions() {
        let svc = test_service();
        svc.initialize_roles(&AuditContext::system()).unwrap();

        assert!(svc
            .has_permission(UserRole::Admin, Resource::Role, Action::Update)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Admin, Resource::Role, Action::Delete)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Admin, Resource::Permission, Action::Delete)
            .unwrap());
        assert!(svc
            .has_permission(UserRole::Admin, Resource::Due, Action::Delete)
            .unwrap());
    }

    #[test]
    fn officer_domain_grants() {
        let svc = test_service();
        svc.initialize_roles(&AuditContext::system()).unwrap();

        assert!(svc
            .has_permission(UserRole::Secretary, Resource::Document, Action::Delete)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Secretary, Resource::Due, Action::Create)
            .unwrap());

        assert!(svc
            .has_permission(UserRole::Treasurer, Resource::FinancialRecord, Action::Create)
            .unwrap());
        assert!(!svc
            .has_permission(UserRole::Treasurer, Resource::Due, Action::Create)
            .unwrap());

        assert!(svc
            .has_permission(UserRole::FinancialSecretary, Resource::Due, Action::Create)
            .unwrap());
    }

    #[test]
    fn any_and_all_combinators() {
        let svc = test_service();
        svc.initialize_roles(&AuditContext::system()).unwrap();

        let pairs = [
            (Resource::Due, Action::Create),
            (Resource::Due, Action::Read),
        ];
        assert!(svc.has_any_permission(UserRole::Member, &pairs).unwrap());
        assert!(!svc.has_all_permissions(UserRole::Member, &pairs).unwrap());
        assert!(svc
            .has_all_permissions(UserRole::FinancialSecretary, &pairs)
            .unwrap());
    }

    #[test]
    fn initialization_is_idempotent_reset() {
        let svc = test_service();
        let ctx = AuditContext::system();
        svc.initialize_roles(&ctx).unwrap();

        // Tamper with the member role, then re-initialize.
        let member = svc.get_role_by_name("member").unwrap();
        let tampered = svc
            .update_role(
                &ctx,
                &member.id,
                serde_json::json!({ "permission_ids": [] }),
            )
            .unwrap();
        assert!(tampered.permission_ids.is_empty());

        svc.initialize_roles(&ctx).unwrap();

        let restored = svc.get_role_by_name("member").unwrap();
        assert_eq!(restored.id, member.id, "no duplicate role created");
        assert_eq!(restored.permission_ids.len(), Resource::ALL.len());

        let list = svc.list_roles(&acpn_core::ListParams::default()).unwrap();
        assert_eq!(list.total, 6);
    }

    #[test]
    fn authenticate_resolves_identity_from_bearer_token() {
        let svc = test_service();
        let ctx = AuditContext::system();
        svc.initialize_roles(&ctx).unwrap();

        let user = svc
            .create_user(
                &ctx,
                crate::model::CreateUser {
                    name: "Officer".into(),
                    email: "officer@acpn.example".into(),
                    password: "password123".into(),
                    role: UserRole::Treasurer,
                },
            )
            .unwrap();
        let (_, tokens) = svc.login("officer@acpn.example", "password123").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", tokens.access_token).parse().unwrap(),
        );

        let identity = svc.authenticate(&headers).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.role, UserRole::Treasurer);

        // Permission checks route through the role table.
        assert!(svc
            .check_permission(&identity, "financial_record", "create")
            .is_ok());
        assert!(matches!(
            svc.check_permission(&identity, "due", "create").unwrap_err(),
            ServiceError::PermissionDenied(_)
        ));
        assert!(matches!(
            svc.check_permission(&identity, "spaceship", "create").unwrap_err(),
            ServiceError::Validation(_)
        ));

        // Missing and malformed tokens are unauthorized.
        assert!(svc.authenticate(&HeaderMap::new()).is_err());

        // Suspension takes effect immediately, not at token expiry.
        svc.suspend_user(&ctx, &user.id).unwrap();
        assert!(matches!(
            svc.authenticate(&headers).unwrap_err(),
            ServiceError::Unauthorized(_)
        ));
    }

    #[test]
    fn default_grant_sets_are_deduplicated() {
        for role in UserRole::ALL {
            let grants = default_role_grants(role);
            let unique: std::collections::HashSet<_> = grants.iter().collect();
            assert_eq!(grants.len(), unique.len(), "{:?} has duplicate grants", role);
        }
        assert_eq!(
            default_role_grants(UserRole::Superadmin).len(),
            Resource::ALL.len() * Action::ALL.len()
        );
        assert_eq!(
            default_role_grants(UserRole::Admin).len(),
            Resource::ALL.len() * Action::ALL.len() - 2
        );
        assert_eq!(
            default_role_grants(UserRole::Member).len(),
            Resource::ALL.len()
        );
    }
}
