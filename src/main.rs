use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use recipe_gateway::cache::GenerationCache;
use recipe_gateway::config::Args;
use recipe_gateway::generator::OpenAiRecipeGenerator;
use recipe_gateway::rate_limit::RateLimiter;
use recipe_gateway::state::{AppState, RecipeCache};
use recipe_gateway::sweeper::{expiry_sweeper, rate_limit_pruner};
use recipe_gateway::{router, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(args.log_format)?;

    let cache: RecipeCache =
        GenerationCache::new(args.cache_config()).context("invalid cache settings")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.ai_timeout))
        .build()
        .context("failed to build HTTP client")?;
    let generator = OpenAiRecipeGenerator::new(
        client,
        &args.ai_base_url,
        args.ai_model.clone(),
        args.ai_api_key.clone(),
    );
    if args.ai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, cache misses will fail");
    }

    let rate_window = Duration::from_secs(args.rate_window);
    let state = Arc::new(
        AppState::new(
            cache,
            Arc::new(generator),
            RateLimiter::new(args.rate_limit, rate_window),
        )
        .with_trusted_forwarding(args.trust_forwarded_for),
    );
    if args.trust_forwarded_for {
        tracing::warn!("Rate limiting by X-Forwarded-For, only safe behind a trusted proxy");
    }

    // spawn the background sweepers
    if let Some(every) = args.sweep_every() {
        tokio::spawn(expiry_sweeper(Arc::clone(&state), every));
    }
    tokio::spawn(rate_limit_pruner(Arc::clone(&state), rate_window));

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        provider = %args.ai_base_url,
        model = %args.ai_model,
        cache_ttl_secs = args.cache_ttl,
        cache_capacity = args.cache_capacity,
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        "Recipe gateway running"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Recipe gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
