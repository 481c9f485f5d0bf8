use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::AppState;

// Background sweeps - expired recipes, and finished rate limit windows

pub async fn expiry_sweeper(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?every, "Expiry sweeper started");

    loop {
        interval.tick().await;

        let removed = state.cache.sweep_expired();
        if removed > 0 {
            debug!(removed, remaining = state.cache.len(), "Swept expired recipes");
        }
    }
}

/// Runs independently of `expiry_sweeper` so the limiter stays bounded even
/// when cache sweeping is turned off.
pub async fn rate_limit_pruner(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every.max(Duration::from_secs(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let pruned = state.rate_limiter.prune();
        if pruned > 0 {
            debug!(
                pruned,
                tracked = state.rate_limiter.tracked_clients(),
                "Pruned rate limit windows"
            );
        }
    }
}
