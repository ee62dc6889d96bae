//! Route registration — collects module routes under `/api` plus system
//! endpoints.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

/// Build the complete router.
///
/// Each module's router carries resource paths relative to `/api`
/// (`/dues`, `/roles`, ...); they are merged and nested under the shared
/// prefix. System endpoints stay at the root.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut api = Router::new();
    for (name, router) in module_routes {
        info!(module = name, "mounting module routes");
        api = api.merge(router);
    }

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .nest("/api", api)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "acpnd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
