//! Content-addressed generation cache with TTL expiry, oldest-first eviction
//! and in-flight de-duplication.
//!
//! A miss registers an in-flight request and runs the generator on its own
//! task. Every caller that arrives for the same key while it runs awaits the
//! same shared outcome, so the generator is called once per key per cycle.
//! Failures are handed to every waiter and never stored.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::generation";

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CAPACITY: usize = 1000;

// Used when `created_at + ttl` does not fit in an Instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Construction parameters for [`GenerationCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a generated value stays fresh.
    pub ttl: Duration,
    /// Maximum number of stored entries.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheConfigError {
    #[error("cache ttl must be greater than zero")]
    ZeroTtl,
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
}

/// The generator task panicked or was cancelled before producing a result.
///
/// Generator error types implement `From<GenerationAborted>` so waiters can
/// still be handed an error of the generator's own type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("generation task ended without producing a result")]
pub struct GenerationAborted;

/// A stored generation result. Replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Outcome<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Marker for a running generation; waiters clone the shared outcome.
struct InFlightRequest<V, E> {
    outcome: Outcome<V, E>,
}

struct State<V, E> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    in_flight: HashMap<CacheKey, InFlightRequest<V, E>>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    failures: AtomicU64,
}

struct Inner<V, E> {
    config: CacheConfig,
    state: Mutex<State<V, E>>,
    counters: Counters,
}

/// Snapshot of cache contents and lifetime counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub in_flight: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub keys: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub joins: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub failures: u64,
}

/// Concurrency-safe cache in front of an expensive generator.
///
/// Clones share the same state. Must be used from within a tokio runtime,
/// generation runs on a spawned task.
pub struct GenerationCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for GenerationCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> GenerationCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static + From<GenerationAborted>,
{
    pub fn new(config: CacheConfig) -> Result<Self, CacheConfigError> {
        if config.ttl.is_zero() {
            return Err(CacheConfigError::ZeroTtl);
        }
        if config.capacity == 0 {
            return Err(CacheConfigError::ZeroCapacity);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    in_flight: HashMap::new(),
                }),
                counters: Counters::default(),
            }),
        })
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Return the fresh value for `key`, or produce it with `generate`.
    ///
    /// `generate` is only called on a miss with no generation already running
    /// for `key`. It is invoked on the generation task, outside the cache
    /// lock, so it may read this cache. The future runs to completion even if
    /// every caller stops waiting for it.
    pub async fn get_or_generate<F, Fut>(&self, key: CacheKey, generate: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let outcome = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "get_or_generate");

            if let Some(value) = self.inner.lookup(&mut state, &key, Instant::now()) {
                return Ok(value);
            }

            let running = state.in_flight.get(&key).map(|flight| flight.outcome.clone());
            match running {
                Some(outcome) => {
                    self.inner.counters.joins.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Joining in-flight generation");
                    outcome
                }
                None => {
                    self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache miss, starting generation");
                    let outcome = self.launch(key.clone(), generate);
                    state.in_flight.insert(
                        key,
                        InFlightRequest {
                            outcome: outcome.clone(),
                        },
                    );
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Look up a fresh value without generating.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let mut state = mutex_lock(&self.inner.state, SOURCE, "get");
        self.inner.lookup(&mut state, key, Instant::now())
    }

    /// Drop the stored entry for `key`. A running generation is unaffected.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut state = mutex_lock(&self.inner.state, SOURCE, "invalidate");
        state.entries.remove(key).is_some()
    }

    /// Drop every stored entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = mutex_lock(&self.inner.state, SOURCE, "clear");
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = mutex_lock(&self.inner.state, SOURCE, "sweep_expired");
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_live(now));
        let removed = before - state.entries.len();
        self.inner
            .counters
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let (size, in_flight, mut keys) = {
            let state = mutex_lock(&self.inner.state, SOURCE, "stats");
            let keys: Vec<String> = state
                .entries
                .keys()
                .map(|key| key.canonical().to_string())
                .collect();
            (state.entries.len(), state.in_flight.len(), keys)
        };
        keys.sort();

        let counters = &self.inner.counters;
        CacheStats {
            size,
            in_flight,
            capacity: self.inner.config.capacity,
            ttl_secs: self.inner.config.ttl.as_secs(),
            keys,
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            joins: counters.joins.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            expirations: counters.expirations.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    // Caller holds the state lock and inserts the in-flight marker before
    // releasing it; the task cannot complete before that.
    fn launch<F, Fut>(&self, key: CacheKey, generate: F) -> Outcome<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let guard = FlightGuard {
            inner: Arc::clone(&self.inner),
            key,
            armed: true,
        };

        let handle = tokio::spawn(async move {
            let result = generate().await;
            guard.complete(&result);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "Generation task did not complete");
                    Err(E::from(GenerationAborted))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl<V: Clone, E> Inner<V, E> {
    /// Return a live value, removing the entry if it has expired.
    fn lookup(&self, state: &mut State<V, E>, key: &CacheKey, now: Instant) -> Option<V> {
        let live = state.entries.get(key)?.is_live(now);
        if !live {
            state.entries.remove(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired, removing");
            return None;
        }

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert a fresh entry, evicting by oldest `created_at` while at capacity.
    fn insert(&self, state: &mut State<V, E>, key: CacheKey, value: V, now: Instant) {
        state.entries.remove(&key);

        while state.entries.len() >= self.config.capacity {
            let Some(oldest) = state
                .entries
                .values()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key.clone())
            else {
                break;
            };
            state.entries.remove(&oldest);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %oldest, "Evicting oldest cache entry");
        }

        let expires_at = now
            .checked_add(self.config.ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                created_at: now,
                expires_at,
            },
        );
    }
}

/// Owns the in-flight marker for one key. Removes it on completion, or on
/// drop if the generator panicked or its task was cancelled.
struct FlightGuard<V, E> {
    inner: Arc<Inner<V, E>>,
    key: CacheKey,
    armed: bool,
}

impl<V: Clone, E> FlightGuard<V, E> {
    fn complete(mut self, result: &Result<V, E>) {
        self.armed = false;
        let mut state = mutex_lock(&self.inner.state, SOURCE, "complete");
        state.in_flight.remove(&self.key);

        match result {
            Ok(value) => {
                self.inner
                    .insert(&mut state, self.key.clone(), value.clone(), Instant::now());
                debug!(key = %self.key, "Generation stored");
            }
            Err(_) => {
                self.inner.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(key = %self.key, "Generation failed, nothing stored");
            }
        }
    }
}

impl<V, E> Drop for FlightGuard<V, E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = mutex_lock(&self.inner.state, SOURCE, "abandon");
        state.in_flight.remove(&self.key);
        self.inner.counters.failures.fetch_add(1, Ordering::Relaxed);
    }
}
