use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use acpn_core::{ok, ok_message, Authenticator, ServiceError};

use crate::model::{LoginRequest, RefreshRequest, RegisterInput};
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/verify/{token}", get(verify_email))
        .route("/auth/password-reset/request", post(request_reset))
        .route("/auth/password-reset/complete", post(complete_reset))
        .route("/auth/me", get(me))
}

async fn register(
    State(svc): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let (user, token) = svc.register(input).map_err(ServiceError::from)?;
    // Delivered by the mailer in deployment; logged for operators here.
    tracing::info!(user_id = %user.id, %token, "verification token issued");
    Ok((StatusCode::CREATED, ok(user.api_view())))
}

async fn login(
    State(svc): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ServiceError> {
    let (user, tokens) = svc
        .login(&body.email, &body.password)
        .map_err(ServiceError::from)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "user": user.api_view(),
            "tokens": tokens,
        }
    })))
}

async fn refresh(
    State(svc): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<Value>, ServiceError> {
    let tokens = svc
        .refresh_tokens(&body.refresh_token)
        .map_err(ServiceError::from)?;
    Ok(ok(tokens))
}

async fn logout(
    State(svc): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    // Revoke the session carried by the presented token.
    let token = crate::service::authorize::extract_bearer(&headers)
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;
    let claims = svc.verify_token(token).map_err(ServiceError::from)?;
    svc.revoke_session(&claims.sid).map_err(ServiceError::from)?;
    Ok(ok_message("logged out"))
}

async fn verify_email(
    State(svc): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let user = svc.verify_email(&token).map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}

#[derive(Deserialize)]
struct ResetRequestBody {
    email: String,
}

async fn request_reset(
    State(svc): State<AppState>,
    Json(body): Json<ResetRequestBody>,
) -> Result<Json<Value>, ServiceError> {
    if let Some(token) = svc
        .request_password_reset(&body.email)
        .map_err(ServiceError::from)?
    {
        tracing::info!(%token, "password reset token issued");
    }
    // Uniform response whether or not the email is registered.
    Ok(ok_message("if the email is registered, a reset link has been sent"))
}

#[derive(Deserialize)]
struct ResetCompleteBody {
    token: String,
    password: String,
}

async fn complete_reset(
    State(svc): State<AppState>,
    Json(body): Json<ResetCompleteBody>,
) -> Result<Json<Value>, ServiceError> {
    svc.reset_password(&body.token, &body.password)
        .map_err(ServiceError::from)?;
    Ok(ok_message("password updated"))
}

async fn me(
    State(svc): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let identity = svc.authenticate(&headers)?;
    let user = svc.get_user(&identity.user_id).map_err(ServiceError::from)?;
    Ok(ok(user.api_view()))
}
