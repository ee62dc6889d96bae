use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, ListParams, ServiceError, UserRole};

use crate::model::{CreatePharmacy, RegistrationStatus};
use crate::service::{PharmacyFilters, RegistryService};

/// Roles allowed to mutate the register.
const REGISTRY_ADMINS: &[UserRole] = &[UserRole::Admin, UserRole::Superadmin];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<RegistryService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the registry API router. Routes are relative to `/api`.
pub fn build_router(svc: Arc<RegistryService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .route("/pharmacies", get(list_pharmacies).post(create_pharmacy))
        .route(
            "/pharmacies/{id}",
            get(get_pharmacy).put(update_pharmacy).delete(delete_pharmacy),
        )
        .route("/pharmacies/{id}/status", put(set_status))
        .with_state(AppState { svc, auth })
}

#[derive(Deserialize)]
struct PharmacyQuery {
    #[serde(flatten)]
    params: ListParams,
    registration_status: Option<RegistrationStatus>,
    user_id: Option<String>,
}

async fn list_pharmacies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PharmacyQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "pharmacy", "read")?;

    let filters = PharmacyFilters {
        registration_status: q.registration_status,
        user_id: q.user_id,
    };
    let result = state.svc.list_pharmacies(&q.params, &filters)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_pharmacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePharmacy>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(REGISTRY_ADMINS)?;
    state.auth.check_permission(&identity, "pharmacy", "create")?;

    let pharmacy = state.svc.create_pharmacy(input)?;
    Ok((StatusCode::CREATED, ok(pharmacy)))
}

async fn get_pharmacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "pharmacy", "read")?;

    let pharmacy = state.svc.get_pharmacy(&id)?;
    Ok(ok(pharmacy))
}

async fn update_pharmacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;

    // The owning user may edit contact details; admins may edit anything.
    let pharmacy = state.svc.get_pharmacy(&id)?;
    if pharmacy.user_id != identity.user_id {
        identity.require_role(REGISTRY_ADMINS)?;
        state.auth.check_permission(&identity, "pharmacy", "update")?;
    }

    let updated = state.svc.update_pharmacy(&id, patch)?;
    Ok(ok(updated))
}

async fn delete_pharmacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(REGISTRY_ADMINS)?;
    state.auth.check_permission(&identity, "pharmacy", "delete")?;

    state.svc.delete_pharmacy(&id)?;
    Ok(ok_message("pharmacy deleted"))
}

#[derive(Deserialize)]
struct StatusBody {
    registration_status: RegistrationStatus,
}

async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(REGISTRY_ADMINS)?;
    state.auth.check_permission(&identity, "pharmacy", "manage")?;

    let pharmacy = state
        .svc
        .set_registration_status(&id, body.registration_status)?;
    Ok(ok(pharmacy))
}
