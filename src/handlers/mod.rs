// src/handlers/mod.rs
pub mod auth;
pub mod rpc;

use crate::AppState;
use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// The full application router with shared state attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::auth_routes())
        .merge(rpc::rpc_routes())
        .route("/api/status", get(api_status))
        .layer(axum::middleware::from_fn(crate::middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "default_model": state.settings.default_model_tag,
        "routes": state.settings.routes(),
    }))
}
