//! Recipe generation gateway: an axum service that turns ingredient lists
//! into recipes through an OpenAI-compatible API, with a de-duplicating
//! generation cache in front of the provider.

pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod sweeper;
pub mod telemetry;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    cache_stats_handler, clear_cache_handler, generate_handler, health_handler, metrics_handler,
};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/recipes/generate", post(generate_handler))
        .route("/api/recipes/cache", delete(clear_cache_handler))
        .route("/api/recipes/cache/stats", get(cache_stats_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
