use std::sync::Arc;

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::main_lib::AppState;

mod health;
mod market;

pub fn app_router(state: Arc<AppState>) -> Router {
    // Any origin, no credentials
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .nest("/api", market::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
