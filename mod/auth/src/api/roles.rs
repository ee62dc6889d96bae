use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, ListParams, ServiceError};

use crate::api::{audit_ctx, AppState};
use crate::model::CreateRole;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{id}", get(get_role).put(update_role).delete(delete_role))
        .route("/roles/initialize/default", post(initialize_roles))
        .route(
            "/roles/{id}/permissions/{permission_id}",
            post(add_permission).delete(remove_permission),
        )
        .route("/roles/{id}/users", get(role_users))
}

async fn list_roles(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "read")?;

    let result = svc.list_roles(&params).map_err(ServiceError::from)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_role(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateRole>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "create")?;

    let role = svc
        .create_role(&audit_ctx(&identity, &headers), input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, ok(role)))
}

async fn get_role(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "read")?;

    let role = svc.get_role(&id).map_err(ServiceError::from)?;
    Ok(ok(role))
}

async fn update_role(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "update")?;

    let role = svc
        .update_role(&audit_ctx(&identity, &headers), &id, patch)
        .map_err(ServiceError::from)?;
    Ok(ok(role))
}

async fn delete_role(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    // Only superadmin holds role:delete under the default grants.
    svc.check_permission(&identity, "role", "delete")?;

    svc.delete_role(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok_message("role deleted"))
}

async fn initialize_roles(
    State(svc): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "manage")?;

    svc.initialize_roles(&audit_ctx(&identity, &headers))
        .map_err(ServiceError::from)?;
    Ok(ok_message("default roles initialized"))
}

async fn add_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path((id, permission_id)): Path<(String, String)>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "update")?;

    let role = svc
        .add_role_permission(&audit_ctx(&identity, &headers), &id, &permission_id)
        .map_err(ServiceError::from)?;
    Ok(ok(role))
}

async fn remove_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path((id, permission_id)): Path<(String, String)>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "update")?;

    let role = svc
        .remove_role_permission(&audit_ctx(&identity, &headers), &id, &permission_id)
        .map_err(ServiceError::from)?;
    Ok(ok(role))
}

async fn role_users(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "role", "read")?;
    svc.check_permission(&identity, "user", "read")?;

    let users = svc.users_for_role(&id).map_err(ServiceError::from)?;
    let items: Vec<Value> = users.iter().map(|u| u.api_view()).collect();
    let total = items.len();
    Ok(ok_list(items, total))
}
