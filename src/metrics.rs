use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, IntGauge, register_counter, register_histogram, register_int_gauge,
};

use crate::cache::CacheStats;

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("recipe_requests_total", "Total number of recipe generation requests").unwrap();
    pub static ref GENERATION_FAILURES: Counter =
        register_counter!("recipe_generation_failures_total", "Recipe requests that ended in a generation error").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "recipe_request_latency_seconds",
        "Recipe request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: IntGauge =
        register_int_gauge!("recipe_cache_entries", "Current number of recipes in cache").unwrap();
    pub static ref CACHE_IN_FLIGHT: IntGauge =
        register_int_gauge!("recipe_cache_in_flight", "Generations currently running").unwrap();
    pub static ref CACHE_HITS: IntGauge =
        register_int_gauge!("recipe_cache_hits", "Cache hits since start").unwrap();
    pub static ref CACHE_MISSES: IntGauge =
        register_int_gauge!("recipe_cache_misses", "Cache misses since start").unwrap();
    pub static ref CACHE_JOINS: IntGauge =
        register_int_gauge!("recipe_cache_joins", "Requests that joined a running generation").unwrap();
    pub static ref CACHE_EVICTIONS: IntGauge =
        register_int_gauge!("recipe_cache_evictions", "Entries evicted due to capacity").unwrap();
}

// Copy a cache snapshot into the exported gauges
pub fn record_cache_stats(stats: &CacheStats) {
    CACHE_SIZE.set(stats.size as i64);
    CACHE_IN_FLIGHT.set(stats.in_flight as i64);
    CACHE_HITS.set(stats.hits as i64);
    CACHE_MISSES.set(stats.misses as i64);
    CACHE_JOINS.set(stats.joins as i64);
    CACHE_EVICTIONS.set(stats.evictions as i64);
}
