use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

// Rate limit entry - tracks requests per client
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

// Fixed-window limiter: `limit` requests per `window` for each client
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit: limit.max(1),
            window,
        }
    }

    /// Count one request for `client`. On refusal returns the time left
    /// until the client's window resets.
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(client.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // window over? start a new one
        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.count = 1;
            entry.window_start = now;
            return Ok(());
        }

        if entry.count < self.limit {
            entry.count += 1;
            return Ok(());
        }

        Err(self.window - elapsed)
    }

    /// Forget clients whose window has already ended, returning how many.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        before.saturating_sub(self.entries.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }
}
