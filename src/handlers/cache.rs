use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::info;

use crate::cache::CacheStats;
use crate::models::ClearCacheResponse;
use crate::state::AppState;

pub async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

pub async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> Json<ClearCacheResponse> {
    let cleared = state.cache.clear();
    info!(cleared, "Recipe cache cleared");
    Json(ClearCacheResponse { cleared })
}
