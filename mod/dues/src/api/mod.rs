mod due_types;
mod dues;
mod payments;

use std::sync::Arc;

use axum::Router;

use acpn_core::{Authenticator, Identity, ServiceError, UserRole};

use crate::service::DuesService;

/// Roles allowed to create, update, delete and assign dues.
pub(crate) const DUES_MANAGERS: &[UserRole] =
    &[UserRole::Admin, UserRole::Superadmin, UserRole::Treasurer];

/// Penalty addition additionally allows the financial secretary.
pub(crate) const PENALTY_ADDERS: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Superadmin,
    UserRole::Treasurer,
    UserRole::FinancialSecretary,
];

/// Removing a penalty is more sensitive than adding one: admins only.
pub(crate) const PENALTY_REMOVERS: &[UserRole] = &[UserRole::Admin, UserRole::Superadmin];

/// Roles allowed to review submitted payments.
pub(crate) const PAYMENT_REVIEWERS: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Superadmin,
    UserRole::Treasurer,
    UserRole::FinancialSecretary,
];

/// Roles allowed to read dues across all pharmacies.
pub(crate) const DUES_READERS: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Superadmin,
    UserRole::Treasurer,
    UserRole::FinancialSecretary,
];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<DuesService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the dues API router. Routes are relative to `/api`.
pub fn build_router(svc: Arc<DuesService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .merge(due_types::routes())
        .merge(dues::routes())
        .merge(payments::routes())
        .with_state(AppState { svc, auth })
}

/// Allow dues managers/readers, or the owning user of the pharmacy.
pub(crate) fn require_reader_or_owner(
    state: &AppState,
    identity: &Identity,
    pharmacy_id: &str,
) -> Result<(), ServiceError> {
    if identity.require_role(DUES_READERS).is_ok() {
        return Ok(());
    }
    let pharmacy = state.svc.registry().get_pharmacy(pharmacy_id)?;
    if pharmacy.user_id == identity.user_id {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(
            "only dues staff or the pharmacy owner may view these dues".into(),
        ))
    }
}
