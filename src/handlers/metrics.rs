use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, TEXT_FORMAT, TextEncoder};
use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::record_cache_stats;
use crate::state::AppState;

pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    record_cache_stats(&state.cache.stats());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {e}")))?;
    let body = String::from_utf8(buffer)
        .map_err(|e| ApiError::Internal(format!("metrics are not valid UTF-8: {e}")))?;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
