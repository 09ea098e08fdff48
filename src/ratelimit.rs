//! Per-domain politeness gate
//!
//! Tracks the next instant each domain may be contacted and blocks callers
//! until then. The read-update-commit on a domain's slot is serialized by a
//! per-domain async lock taken from a map of locks; the lock is held only
//! around the commit, never across the sleep.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Per-domain rate limiter
pub struct RateLimiter {
    default_delay: f64,
    next_access: Mutex<HashMap<String, Instant>>,
    delays: Mutex<HashMap<String, f64>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RateLimiter {
    /// Creates a limiter with a default spacing and per-domain overrides
    ///
    /// # Arguments
    ///
    /// * `default_delay` - Seconds between requests to a domain with no override
    /// * `overrides` - Per-domain delays from configuration
    pub fn new(default_delay: f64, overrides: &HashMap<String, f64>) -> Self {
        Self {
            default_delay,
            next_access: Mutex::new(HashMap::new()),
            delays: Mutex::new(overrides.clone()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn domain_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Blocks until a request to `domain` is allowed, then claims the slot
    ///
    /// On return the caller owns the next send window: the domain's
    /// next-allowed time has been advanced by its effective delay.
    pub async fn wait(&self, domain: &str) {
        if domain.is_empty() {
            return;
        }

        let lock = self.domain_lock(domain).await;

        loop {
            let deadline = {
                let _guard = lock.lock().await;
                let now = Instant::now();
                let mut next_access = self.next_access.lock().await;
                let next = next_access.get(domain).copied().unwrap_or(now);
                if now >= next {
                    let delay = self.delay_for(domain).await;
                    next_access.insert(domain.to_string(), now + Duration::from_secs_f64(delay));
                    return;
                }
                next
            };

            tracing::trace!(domain, "rate limit: waiting for next window");
            sleep_until(deadline).await;
        }
    }

    /// Overrides the delay for a domain; ignored unless positive
    pub async fn update_delay(&self, domain: &str, delay: f64) {
        if delay > 0.0 && delay.is_finite() {
            let mut delays = self.delays.lock().await;
            let previous = delays.insert(domain.to_string(), delay);
            if previous != Some(delay) {
                tracing::info!(domain, delay, "rate limit delay updated");
            }
        }
    }

    /// Effective delay for a domain, in seconds
    pub async fn delay_for(&self, domain: &str) -> f64 {
        let delays = self.delays.lock().await;
        delays.get(domain).copied().unwrap_or(self.default_delay)
    }

    /// Drops all state for a domain
    pub async fn reset(&self, domain: &str) {
        self.next_access.lock().await.remove(domain);
        self.delays.lock().await.remove(domain);
        self.locks.lock().await.remove(domain);
        tracing::debug!(domain, "rate limit state reset");
    }

    /// Drops all rate-limiting state
    pub async fn reset_all(&self) {
        self.next_access.lock().await.clear();
        self.delays.lock().await.clear();
        self.locks.lock().await.clear();
    }
}
