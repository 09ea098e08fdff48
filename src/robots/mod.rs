//! Robots.txt checking
//!
//! Fetches and caches robots.txt per origin (`scheme://host[:port]`),
//! evaluates Allow/Disallow rules for the configured agent, and propagates
//! Crawl-delay values into the rate limiter. Concurrent checks against one
//! origin share a single in-flight fetch.

mod cache;
mod parser;

pub use cache::{FetchStatus, RobotsEntry};
pub use parser::{RobotRules, RobotsParseError};

use crate::ratelimit::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Robots.txt gate consulted before every fetch
pub struct RobotsChecker {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    agent: String,
    respect_robots_txt: bool,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    cache: Mutex<HashMap<String, RobotsEntry>>,
    origin_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RobotsChecker {
    /// Creates a checker sharing the engine's HTTP client
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `rate_limiter` - Receives Crawl-delay overrides as they are discovered
    /// * `agent` - Agent name used when extracting Crawl-delay
    /// * `respect_robots_txt` - When false, every check passes
    /// * `cache_ttl` - How long a fetched entry stays valid, in seconds
    /// * `request_timeout` - The engine's request timeout; robots fetches are
    ///   capped at the lesser of this and 15 seconds
    pub fn new(
        client: reqwest::Client,
        rate_limiter: Arc<RateLimiter>,
        agent: String,
        respect_robots_txt: bool,
        cache_ttl: u64,
        request_timeout: u64,
    ) -> Self {
        Self {
            client,
            rate_limiter,
            agent,
            respect_robots_txt,
            cache_ttl: Duration::from_secs(cache_ttl),
            fetch_timeout: Duration::from_secs(request_timeout.min(15)),
            cache: Mutex::new(HashMap::new()),
            origin_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether `agent` may fetch `url`
    ///
    /// Unparseable URLs are denied. Fetch and parse failures for the origin's
    /// robots.txt deny everything on that origin until the cache entry
    /// expires; a missing robots.txt allows everything.
    pub async fn can_fetch(&self, agent: &str, url: &str) -> bool {
        if !self.respect_robots_txt {
            return true;
        }

        let Some(origin) = origin_of(url) else {
            return false;
        };

        let entry = self.origin_entry(&origin).await;
        let allowed = entry.allows(agent, url);
        if !allowed {
            tracing::debug!(url, origin, status = ?entry.status, "robots: denied");
        }
        allowed
    }

    /// Crawl-delay for the origin of `url`, if its cached rules specify one
    pub async fn crawl_delay(&self, agent: &str, url: &str) -> Option<f64> {
        if !self.respect_robots_txt {
            return None;
        }
        let origin = origin_of(url)?;
        let cache = self.cache.lock().await;
        cache
            .get(&origin)
            .and_then(|entry| entry.rules.as_ref())
            .and_then(|rules| rules.crawl_delay(agent))
    }

    /// Drops all cached entries
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
        self.origin_locks.lock().await.clear();
        tracing::debug!("robots cache cleared");
    }

    /// Number of cached origins
    pub async fn cached_origins(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn origin_lock(&self, origin: &str) -> Arc<Mutex<()>> {
        let mut locks = self.origin_locks.lock().await;
        locks
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the cached entry for an origin, fetching robots.txt if needed
    ///
    /// The per-origin lock makes the fetch single-flight: concurrent callers
    /// for one origin wait for the first fetch instead of issuing their own.
    async fn origin_entry(&self, origin: &str) -> RobotsEntry {
        let lock = self.origin_lock(origin).await;
        let _guard = lock.lock().await;

        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(origin) {
                if !entry.is_expired(self.cache_ttl) {
                    return entry.clone();
                }
            }
        }

        let entry = self.fetch_entry(origin).await;
        self.cache
            .lock()
            .await
            .insert(origin.to_string(), entry.clone());
        entry
    }

    async fn fetch_entry(&self, origin: &str) -> RobotsEntry {
        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!(url = %robots_url, "robots: fetching");

        let response = match self
            .client
            .get(&robots_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %robots_url, error = %e, "robots: fetch failed");
                return RobotsEntry::new(None, FetchStatus::FetchError);
            }
        };

        // The shared client never follows redirects, so this was a single
        // request; a 3xx answer lands in the unusable-status arm and a
        // robots.txt served from elsewhere is never read.
        let status = response.status();
        match status.as_u16() {
            200 => {}
            401 | 403 | 404 | 410 => {
                return RobotsEntry::new(None, FetchStatus::Absent);
            }
            _ => {
                tracing::debug!(url = %robots_url, %status, "robots: unusable status");
                return RobotsEntry::new(None, FetchStatus::FetchError);
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %robots_url, error = %e, "robots: body read failed");
                return RobotsEntry::new(None, FetchStatus::FetchError);
            }
        };

        let trimmed = body.trim();
        if trimmed.is_empty() || looks_like_html(trimmed) {
            return RobotsEntry::new(None, FetchStatus::Absent);
        }

        match RobotRules::from_content(&body) {
            Ok(rules) => {
                self.apply_crawl_delay(origin, &rules).await;
                RobotsEntry::new(Some(rules), FetchStatus::Success)
            }
            Err(_) => {
                tracing::warn!(url = %robots_url, "robots: unparseable body");
                RobotsEntry::new(None, FetchStatus::ParseError)
            }
        }
    }

    async fn apply_crawl_delay(&self, origin: &str, rules: &RobotRules) {
        let Some(host) = origin.split("://").nth(1) else {
            return;
        };
        let host = host.split(':').next().unwrap_or(host);
        if let Some(delay) = rules.crawl_delay(&self.agent) {
            self.rate_limiter.update_delay(host, delay).await;
        }
    }
}

/// Heuristic for an HTML error page served where robots.txt should be
///
/// Some servers answer 200 with their generic landing page; that carries no
/// rules and is treated like a missing file.
fn looks_like_html(body: &str) -> bool {
    let lower = body.trim_start().to_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

/// Derives the robots.txt origin (`scheme://host[:port]`) for a URL
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    let mut origin = format!("{}://{}", parsed.scheme(), host.to_lowercase());
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{}", port));
    }
    Some(origin)
}
