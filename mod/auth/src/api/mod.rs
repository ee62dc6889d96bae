mod audit;
mod permissions;
mod roles;
mod session;
mod users;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;

use acpn_core::Identity;

use crate::model::AuditContext;
use crate::service::AuthService;

/// Shared application state.
pub type AppState = Arc<AuthService>;

/// Build the auth API router. Routes are relative to `/api`.
pub fn build_router(svc: Arc<AuthService>) -> Router {
    Router::new()
        .merge(session::routes())
        .merge(users::routes())
        .merge(roles::routes())
        .merge(permissions::routes())
        .merge(audit::routes())
        .with_state(svc)
}

/// Audit attribution for a privileged mutation: the acting identity plus
/// the proxied client address when present.
pub(crate) fn audit_ctx(identity: &Identity, headers: &HeaderMap) -> AuditContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    AuditContext {
        actor_id: identity.user_id.clone(),
        ip_address,
    }
}
