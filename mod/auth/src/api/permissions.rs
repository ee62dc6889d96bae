use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, ListParams, ServiceError};

use crate::api::{audit_ctx, AppState};
use crate::model::{CreatePermission, Resource};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/permissions", get(list_permissions).post(create_permission))
        .route(
            "/permissions/{id}",
            get(get_permission).put(update_permission).delete(delete_permission),
        )
        .route("/permissions/initialize/default", post(initialize_permissions))
}

#[derive(Deserialize)]
struct PermissionQuery {
    #[serde(flatten)]
    params: ListParams,
    resource: Option<Resource>,
}

async fn list_permissions(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PermissionQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "permission", "read")?;

    let result = svc
        .list_permissions(&q.params, q.resource)
        .map_err(ServiceError::from)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePermission>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "permission", "create")?;

    let permission = svc
        .create_permission(&audit_ctx(&identity, &headers), input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, ok(permission)))
}

async fn get_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "permission", "read")?;

    let permission = svc.get_permission(&id).map_err(ServiceError::from)?;
    Ok(ok(permission))
}

async fn update_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "permission", "update")?;

    let permission = svc
        .update_permission(&audit_ctx(&identity, &headers), &id, patch)
        .map_err(ServiceError::from)?;
    Ok(ok(permission))
}

async fn delete_permission(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    // Only superadmin holds permission:delete under the default grants.
    svc.check_permission(&identity, "permission", "delete")?;

    svc.delete_permission(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok_message("permission deleted"))
}

async fn initialize_permissions(
    State(svc): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    svc.check_permission(&identity, "permission", "manage")?;

    let created = svc
        .initialize_permissions(&audit_ctx(&identity, &headers))
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "created": created }
    })))
}
