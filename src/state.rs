use std::sync::Arc;

use crate::cache::GenerationCache;
use crate::generator::{GenerationError, RecipeGenerator};
use crate::models::Recipe;
use crate::rate_limit::RateLimiter;

pub type RecipeCache = GenerationCache<Arc<Recipe>, GenerationError>;

// app's shared state
pub struct AppState {
    pub cache: RecipeCache,
    pub generator: Arc<dyn RecipeGenerator>,
    pub rate_limiter: RateLimiter,
    /// Key rate limits on `X-Forwarded-For` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(
        cache: RecipeCache,
        generator: Arc<dyn RecipeGenerator>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            cache,
            generator,
            rate_limiter,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trusted_forwarding(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}
