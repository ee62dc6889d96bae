use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok_list, Authenticator, ListParams, ServiceError, UserRole};

use crate::api::AppState;
use crate::service::audit::AuditFilters;

pub fn routes() -> Router<AppState> {
    Router::new().route("/audit-trail", get(list_audit_trail))
}

#[derive(Deserialize)]
struct AuditQuery {
    #[serde(flatten)]
    params: ListParams,
    user_id: Option<String>,
    resource_type: Option<String>,
}

async fn list_audit_trail(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<AuditQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(&[UserRole::Admin, UserRole::Superadmin])?;
    svc.check_permission(&identity, "audit_trail", "read")?;

    let filters = AuditFilters {
        user_id: q.user_id,
        resource_type: q.resource_type,
    };
    let result = svc
        .list_audit_trail(&q.params, &filters)
        .map_err(ServiceError::from)?;
    Ok(ok_list(result.items, result.total))
}
