//! Generation cache: content-addressed keys, TTL expiry, oldest-first
//! eviction and in-flight de-duplication.

pub mod generation;
pub mod key;
mod lock;

pub use generation::{
    CacheConfig, CacheConfigError, CacheEntry, CacheStats, GenerationAborted, GenerationCache,
};
pub use key::{CacheKey, normalize_ingredients};
