use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, ListParams, ServiceError};

use crate::api::{AppState, DUES_MANAGERS};
use crate::model::CreateDueType;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/due-types", get(list_due_types).post(create_due_type))
        .route(
            "/due-types/{id}",
            get(get_due_type).put(update_due_type).delete(delete_due_type),
        )
}

async fn list_due_types(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ServiceError> {
    // Any authenticated caller may read the due type catalog.
    let _identity = state.auth.authenticate(&headers)?;
    let result = state.svc.list_due_types(&params)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_due_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateDueType>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let due_type = state.svc.create_due_type(input)?;
    Ok((StatusCode::CREATED, ok(due_type)))
}

async fn get_due_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let _identity = state.auth.authenticate(&headers)?;
    let due_type = state.svc.get_due_type(&id)?;
    Ok(ok(due_type))
}

async fn update_due_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let due_type = state.svc.update_due_type(&id, patch)?;
    Ok(ok(due_type))
}

async fn delete_due_type(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    state.svc.delete_due_type(&id)?;
    Ok(ok_message("due type deleted"))
}
