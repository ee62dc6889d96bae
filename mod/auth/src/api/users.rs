use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_list, ok_message, Authenticator, ListParams, ServiceError, UserRole};

use crate::api::{audit_ctx, AppState};
use crate::model::{CreateUser, UserStatus};
use crate::service::user::UserFilters;

/// Roles allowed to administer user accounts.
const USER_ADMINS: &[UserRole] = &[UserRole::Admin, UserRole::Superadmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(deactivate_user))
        .route("/users/{id}/approve", post(approve_user))
        .route("/users/{id}/reject", post(reject_user))
        .route("/users/{id}/suspend", post(suspend_user))
        .route("/users/{id}/reactivate", post(reactivate_user))
        .route("/users/{id}/role", put(change_role))
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(flatten)]
    params: ListParams,
    role: Option<UserRole>,
    status: Option<UserStatus>,
}

async fn list_users(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<UserQuery>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;

    let filters = UserFilters {
        role: q.role,
        status: q.status,
    };
    let result = svc
        .list_users(&q.params, &filters)
        .map_err(ServiceError::from)?;
    let items: Vec<Value> = result.items.iter().map(|u| u.api_view()).collect();
    Ok(ok_list(items, result.total))
}

async fn create_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;
    svc.check_permission(&identity, "user", "create")?;

    let user = svc
        .create_user(&audit_ctx(&identity, &headers), input)
        .map_err(ServiceError::from)?;
    Ok((StatusCode::CREATED, ok(user.api_view())))
}

async fn get_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    // Users may read their own record; otherwise admin only.
    if identity.user_id != id {
        identity.require_role(USER_ADMINS)?;
    }
    let user = svc.get_user(&id).map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

async fn update_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    if identity.user_id != id {
        identity.require_role(USER_ADMINS)?;
        svc.check_permission(&identity, "user", "update")?;
    }
    let user = svc
        .update_user(&audit_ctx(&identity, &headers), &id, patch)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

async fn deactivate_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;
    svc.check_permission(&identity, "user", "delete")?;

    // Accounts are soft-deactivated, never hard-deleted.
    svc.deactivate_user(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok_message("user deactivated"))
}

async fn approve_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;
    svc.check_permission(&identity, "user", "approve")?;

    let user = svc
        .approve_user(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

#[derive(Deserialize, Default)]
struct RejectBody {
    reason: Option<String>,
}

async fn reject_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<RejectBody>>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;
    svc.check_permission(&identity, "user", "reject")?;

    let reason = body.and_then(|Json(b)| b.reason);
    let user = svc
        .reject_user(&audit_ctx(&identity, &headers), &id, reason)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

async fn suspend_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;

    let user = svc
        .suspend_user(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

async fn reactivate_user(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;

    let user = svc
        .reactivate_user(&audit_ctx(&identity, &headers), &id)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

#[derive(Deserialize)]
struct ChangeRoleBody {
    role: UserRole,
}

async fn change_role(
    State(svc): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ChangeRoleBody>,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    identity.require_role(USER_ADMINS)?;
    svc.check_permission(&identity, "user", "assign")?;

    let user = svc
        .change_user_role(&audit_ctx(&identity, &headers), &id, body.role)
        .map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}
