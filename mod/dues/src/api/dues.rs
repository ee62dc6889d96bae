use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, ListParams, ServiceError};

use crate::api::{
    require_reader_or_owner, AppState, DUES_MANAGERS, DUES_READERS, PENALTY_ADDERS,
    PENALTY_REMOVERS,
};
use crate::model::{AssignDuesInput, CreateDue, PaymentStatus};
use crate::service::due::DueFilters;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dues", get(list_dues).post(create_due))
        .route("/dues/assign", post(assign_dues))
        .route("/dues/stats", get(dues_stats))
        .route("/dues/analytics", get(dues_analytics))
        .route("/dues/{id}", get(get_due).put(update_due).delete(delete_due))
        .route("/dues/{id}/pay", post(pay_due))
        .route("/dues/{id}/penalty", post(add_penalty))
        .route("/dues/{id}/penalty/{penalty_id}", delete(remove_penalty))
        .route("/dues/pharmacy/{pharmacy_id}", get(pharmacy_dues))
        .route("/dues/pharmacy/{pharmacy_id}/analytics", get(pharmacy_analytics))
}

#[derive(Deserialize)]
struct DueQuery {
    #[serde(flatten)]
    params: ListParams,
    pharmacy_id: Option<String>,
    due_type_id: Option<String>,
    year: Option<i32>,
    payment_status: Option<PaymentStatus>,
}

async fn list_dues(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<DueQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_READERS)?;

    let filters = DueFilters {
        pharmacy_id: q.pharmacy_id,
        due_type_id: q.due_type_id,
        year: q.year,
        payment_status: q.payment_status,
    };
    let result = state.svc.list_dues(&q.params, &filters)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateDue>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let due = state.svc.create_due(input)?;
    Ok((StatusCode::CREATED, ok(due)))
}

async fn assign_dues(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AssignDuesInput>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let outcome = state.svc.assign_dues(input)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "count": outcome.created.len(),
        "data": outcome,
    })))
}

async fn get_due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let due = state.svc.get_due(&id)?;
    require_reader_or_owner(&state, &identity, &due.pharmacy_id)?;
    Ok(ok(due))
}

async fn update_due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let due = state.svc.update_due(&id, patch)?;
    Ok(ok(due))
}

async fn delete_due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    state.svc.delete_due(&id)?;
    Ok(ok_message("due deleted"))
}

#[derive(Deserialize, Default)]
struct PayBody {
    payment_reference: Option<String>,
}

async fn pay_due(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<PayBody>>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_MANAGERS)?;

    let reference = body.and_then(|Json(b)| b.payment_reference);
    let due = state.svc.mark_paid(&id, reference)?;
    Ok(ok(due))
}

#[derive(Deserialize)]
struct PenaltyBody {
    amount: f64,
    reason: String,
}

async fn add_penalty(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PenaltyBody>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(PENALTY_ADDERS)?;

    let due = state
        .svc
        .add_penalty(&id, body.amount, &body.reason, &identity.user_id)?;
    Ok(ok(due))
}

async fn remove_penalty(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, penalty_id)): Path<(String, String)>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(PENALTY_REMOVERS)?;

    let due = state.svc.remove_penalty(&id, &penalty_id)?;
    Ok(ok(due))
}

async fn pharmacy_dues(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(pharmacy_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    require_reader_or_owner(&state, &identity, &pharmacy_id)?;

    let dues = state.svc.pharmacy_dues(&pharmacy_id)?;
    let total = dues.len();
    Ok(ok_list(dues, total))
}

async fn pharmacy_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(pharmacy_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    require_reader_or_owner(&state, &identity, &pharmacy_id)?;

    let report = state.svc.pharmacy_dues_analytics(&pharmacy_id)?;
    Ok(ok(report))
}

async fn dues_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_READERS)?;

    let stats = state.svc.dues_stats()?;
    Ok(ok(stats))
}

async fn dues_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(DUES_READERS)?;

    let analytics = state.svc.dues_analytics()?;
    Ok(ok(analytics))
}
