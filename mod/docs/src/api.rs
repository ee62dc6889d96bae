use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, Identity, ListParams, ServiceError};

use crate::model::{AccessLevel, CreateDocument, DocumentCategory, DocumentStatus};
use crate::service::access::{allowed_levels, has_document_access};
use crate::service::document::DocumentFilters;
use crate::service::DocsService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<DocsService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the docs API router. Routes are relative to `/api`.
pub fn build_router(svc: Arc<DocsService>, auth: Arc<dyn Authenticator>) -> Router {
    Router::new()
        .route(
            "/organization-documents",
            get(list_documents).post(create_document),
        )
        .route("/organization-documents/summary", get(summary))
        .route(
            "/organization-documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/organization-documents/{id}/archive", post(archive_document))
        .route("/organization-documents/{id}/file", post(upload_file))
        .route("/organization-documents/{id}/download", get(download_document))
        .route("/organization-documents/{id}/view", post(view_document))
        .route("/organization-documents/{id}/versions", get(list_versions))
        .with_state(AppState { svc, auth })
}

/// Read gate: the hand-coded access-level hierarchy, not the permission
/// table.
fn require_read_access(
    identity: &Identity,
    level: AccessLevel,
) -> Result<(), ServiceError> {
    if has_document_access(identity.role, level) {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(format!(
            "role '{}' may not read {} documents",
            identity.role,
            level.as_str()
        )))
    }
}

#[derive(Deserialize)]
struct DocumentQuery {
    #[serde(flatten)]
    params: ListParams,
    category: Option<DocumentCategory>,
    access_level: Option<AccessLevel>,
    status: Option<DocumentStatus>,
}

async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<DocumentQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;

    let filters = DocumentFilters {
        category: q.category,
        access_level: q.access_level,
        status: q.status,
    };
    let result = state
        .svc
        .list_documents(&q.params, &filters, &allowed_levels(identity.role))?;
    Ok(ok_list(result.items, result.total))
}

async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "create")?;

    let document = state.svc.create_document(input, &identity.user_id)?;
    Ok((StatusCode::CREATED, ok(document)))
}

async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let document = state.svc.get_document(&id)?;
    require_read_access(&identity, document.access_level)?;
    Ok(ok(document))
}

async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "update")?;

    let document = state.svc.update_document(&id, patch, &identity.user_id)?;
    Ok(ok(document))
}

async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "delete")?;

    state.svc.delete_document(&id)?;
    Ok(ok_message("document deleted"))
}

async fn archive_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "update")?;

    let document = state.svc.archive_document(&id, &identity.user_id)?;
    Ok(ok(document))
}

#[derive(Deserialize)]
struct UploadQuery {
    file_name: String,
    #[serde(default)]
    change_note: Option<String>,
}

async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "update")?;

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let document = state.svc.upload_version(
        &id,
        &q.file_name,
        mime_type,
        &body,
        &identity.user_id,
        q.change_note,
    )?;
    Ok(ok(document))
}

async fn download_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let document = state.svc.get_document(&id)?;
    require_read_access(&identity, document.access_level)?;

    let (document, content) = state.svc.download_document(&id)?;
    let mime = document
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.unwrap_or_else(|| "document".to_string())
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

async fn view_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let document = state.svc.get_document(&id)?;
    require_read_access(&identity, document.access_level)?;

    let document = state.svc.view_document(&id)?;
    Ok(ok(document))
}

async fn list_versions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    let document = state.svc.get_document(&id)?;
    require_read_access(&identity, document.access_level)?;

    let versions = state.svc.list_versions(&id)?;
    let total = versions.len();
    Ok(ok_list(versions, total))
}

async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = state.auth.authenticate(&headers)?;
    state.auth.check_permission(&identity, "document", "read")?;

    let summary = state.svc.summary()?;
    Ok(ok(summary))
}
