use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ListParams, ServiceError};

use crate::api::{AppState, PAYMENT_REVIEWERS};
use crate::model::{ApprovalStatus, SubmitPayment};
use crate::service::payment::PaymentFilters;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(submit_payment))
        .route("/payments/{id}", get(get_payment))
        .route("/payments/{id}/approve", post(approve_payment))
        .route("/payments/{id}/reject", post(reject_payment))
}

#[derive(Deserialize)]
struct PaymentQuery {
    #[serde(flatten)]
    params: ListParams,
    due_id: Option<String>,
    pharmacy_id: Option<String>,
    approval_status: Option<ApprovalStatus>,
}

async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PaymentQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(PAYMENT_REVIEWERS)?;

    let filters = PaymentFilters {
        due_id: q.due_id,
        pharmacy_id: q.pharmacy_id,
        approval_status: q.approval_status,
    };
    let result = state.svc.list_payments(&q.params, &filters)?;
    Ok(ok_list(result.items, result.total))
}

async fn submit_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SubmitPayment>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;

    // Staff may record on behalf of anyone; a member may only submit for
    // a due owned by their own pharmacy.
    if identity.require_role(PAYMENT_REVIEWERS).is_err() {
        let due = state.svc.get_due(&input.due_id)?;
        let pharmacy = state.svc.registry().get_pharmacy(&due.pharmacy_id)?;
        if pharmacy.user_id != identity.user_id {
            return Err(ServiceError::PermissionDenied(
                "payments may only be submitted for your own pharmacy".into(),
            ));
        }
    }

    let payment = state.svc.submit_payment(input, &identity.user_id)?;
    Ok((StatusCode::CREATED, ok(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let payment = state.svc.get_payment(&id)?;

    if identity.require_role(PAYMENT_REVIEWERS).is_err()
        && payment.submitted_by != identity.user_id
    {
        return Err(ServiceError::PermissionDenied(
            "only payment reviewers or the submitter may view this payment".into(),
        ));
    }
    Ok(ok(payment))
}

async fn approve_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(PAYMENT_REVIEWERS)?;

    let payment = state.svc.approve_payment(&id, &identity.user_id)?;
    Ok(ok(payment))
}

#[derive(Deserialize)]
struct RejectBody {
    reason: String,
}

async fn reject_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(PAYMENT_REVIEWERS)?;

    let payment = state.svc.reject_payment(&id, &identity.user_id, &body.reason)?;
    Ok(ok(payment))
}
