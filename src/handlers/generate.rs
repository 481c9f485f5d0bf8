use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{Extensions, HeaderMap},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheKey, normalize_ingredients};
use crate::error::ApiError;
use crate::metrics::{GENERATION_FAILURES, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{GenerateRecipeRequest, GenerateRecipeResponse};
use crate::state::AppState;

const MAX_INGREDIENTS: usize = 50;
const ANONYMOUS_CLIENT: &str = "anonymous";

// Rate limit bucket: the peer IP, or the first X-Forwarded-For hop when the
// proxy in front is trusted. No address at all means one shared bucket.
fn client_id(headers: &HeaderMap, extensions: &Extensions, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<GenerateRecipeRequest>, JsonRejection>,
) -> Result<Json<GenerateRecipeResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    let client = client_id(&headers, &extensions, state.trust_forwarded_for);
    if let Err(retry_after) = state.rate_limiter.check(&client) {
        warn!(client = %client, "Rate limit exceeded");
        return Err(ApiError::RateLimited { retry_after });
    }

    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request(rejection.body_text())
    })?;

    if payload.ingredients.len() > MAX_INGREDIENTS {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_INGREDIENTS} ingredients are allowed"
        )));
    }
    let ingredients = normalize_ingredients(&payload.ingredients);
    let key = CacheKey::from_normalized(&ingredients)
        .ok_or_else(|| ApiError::bad_request("at least one ingredient is required"))?;

    let start_time = Instant::now();

    let generator = Arc::clone(&state.generator);
    let names = ingredients.clone();
    let result = state
        .cache
        .get_or_generate(key.clone(), move || async move {
            generator.generate(&names).await.map(Arc::new)
        })
        .await;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let recipe = result.map_err(|err| {
        GENERATION_FAILURES.inc();
        warn!(key = %key, error = %err, "Recipe generation failed");
        ApiError::Generation(err)
    })?;
    debug!(key = %key, title = %recipe.title, "Recipe served");

    Ok(Json(GenerateRecipeResponse {
        cache_key: key.digest().to_string(),
        ingredients,
        recipe: recipe.as_ref().clone(),
    }))
}
