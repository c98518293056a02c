use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::main_lib::AppState;

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to BIST Stock Analysis API" }))
}

/// Liveness plus the providers that have credentials.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let providers = state.market_service.orchestrator().configured_providers();
    Json(json!({
        "status": "healthy",
        "service": "Wolfee Analytics API",
        "providers": providers,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}
