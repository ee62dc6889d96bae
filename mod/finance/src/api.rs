use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, ListParams, ServiceError, UserRole};

use crate::model::{CreateRecord, RecordCategory, RecordStatus, RecordType};
use crate::service::record::RecordFilters;
use crate::service::FinanceService;

/// Roles allowed to write the ledger.
const LEDGER_WRITERS: &[UserRole] =
    &[UserRole::Admin, UserRole::Superadmin, UserRole::Treasurer];

/// The financial secretary additionally reads the ledger and reports.
const LEDGER_READERS: &[UserRole] = &[
    UserRole::Admin,
    UserRole::Superadmin,
    UserRole::Treasurer,
    UserRole::FinancialSecretary,
];

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<FinanceService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the finance API router. Routes are relative to `/api`.
pub fn build_router(svc: Arc<FinanceService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .route("/financial-records", get(list_records).post(create_record))
        .route("/financial-records/summary", get(summary))
        .route("/financial-records/reports", get(reports))
        .route(
            "/financial-records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(AppState { svc, auth })
}

#[derive(Deserialize)]
struct RecordQuery {
    #[serde(flatten)]
    params: ListParams,
    #[serde(rename = "type")]
    record_type: Option<RecordType>,
    category: Option<RecordCategory>,
    status: Option<RecordStatus>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<RecordQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_READERS)?;

    let filters = RecordFilters {
        record_type: q.record_type,
        category: q.category,
        status: q.status,
        start_date: q.start_date,
        end_date: q.end_date,
    };
    let result = state.svc.list_records(&q.params, &filters)?;
    Ok(ok_list(result.items, result.total))
}

async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateRecord>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_WRITERS)?;
    state
        .auth
        .check_permission(&identity, "financial_record", "create")?;

    let record = state.svc.create_record(input, &identity.user_id)?;
    Ok((StatusCode::CREATED, ok(record)))
}

async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_READERS)?;

    let record = state.svc.get_record(&id)?;
    Ok(ok(record))
}

async fn update_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_WRITERS)?;
    state
        .auth
        .check_permission(&identity, "financial_record", "update")?;

    let record = state.svc.update_record(&id, patch)?;
    Ok(ok(record))
}

async fn delete_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_WRITERS)?;
    state
        .auth
        .check_permission(&identity, "financial_record", "delete")?;

    state.svc.delete_record(&id)?;
    Ok(ok_message("financial record deleted"))
}

#[derive(Deserialize)]
struct SummaryQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_READERS)?;

    let summary = state
        .svc
        .summary(q.start_date.as_deref(), q.end_date.as_deref())?;
    Ok(ok(summary))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReportKind {
    Yearly,
    Monthly,
    Custom,
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(rename = "type")]
    kind: ReportKind,
    year: Option<i32>,
    month: Option<u32>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ReportQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    identity.require_role(LEDGER_READERS)?;

    let report = match q.kind {
        ReportKind::Yearly => {
            let year = q
                .year
                .ok_or_else(|| ServiceError::Validation("year is required".into()))?;
            serde_json::to_value(state.svc.yearly_report(year)?)
        }
        ReportKind::Monthly => {
            let year = q
                .year
                .ok_or_else(|| ServiceError::Validation("year is required".into()))?;
            let month = q
                .month
                .ok_or_else(|| ServiceError::Validation("month is required".into()))?;
            serde_json::to_value(state.svc.monthly_report(year, month)?)
        }
        ReportKind::Custom => {
            let start = q.start_date.as_deref().ok_or_else(|| {
                ServiceError::Validation("start_date is required".into())
            })?;
            let end = q
                .end_date
                .as_deref()
                .ok_or_else(|| ServiceError::Validation("end_date is required".into()))?;
            serde_json::to_value(state.svc.custom_report(start, end)?)
        }
    }
    .map_err(|e| ServiceError::Internal(e.to_string()))?;

    Ok(ok(report))
}
