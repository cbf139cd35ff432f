//! Health endpoint (no authentication)

use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "shien-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
