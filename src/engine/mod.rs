//! Crawler engine and worker pool
//!
//! The engine owns every shared component (HTTP client, frontier, robots
//! checker, rate limiter, dedupe filter, metrics, sinks) and runs N workers
//! over the fetch-parse-enqueue pipeline plus one metrics sampler that
//! doubles as the idle-shutdown detector. It is a plain value with an
//! explicit lifecycle: construct, `run`, `stop`; the control surface in
//! [`control`] holds one long-lived handle.

mod control;
mod worker;

pub use control::{ControlResponse, Controller, DomainAction, ResetReport};

use crate::bloom::UrlBloom;
use crate::config::CrawlerConfig;
use crate::frontier::{ClearOptions, Frontier, KeyValueStore};
use crate::metrics::{CrawlerMetrics, MetricsSnapshot};
use crate::ratelimit::RateLimiter;
use crate::robots::RobotsChecker;
use crate::sink::{BusSink, DocumentSink, FileSink};
use crate::url::{canonicalize, extract_host};
use crate::{CrawlerError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Point-in-time engine status
///
/// Always obtainable, even with the store down: counts the store could not
/// answer come back as -1 and `store_connected` reports the outage.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub uptime_seconds: f64,
    pub pages_crawled: u64,
    /// Configured page cap; 0 means unlimited
    pub max_pages: u64,
    /// Pages left under the cap; None when unlimited
    pub pages_remaining: Option<u64>,
    pub avg_pages_per_second: f64,
    pub queue_size: i64,
    pub processing_count: i64,
    pub completed_count: i64,
    pub seen_count: i64,
    pub bloom_items: u64,
    pub robots_denied: u64,
    pub errors: u64,
    pub workers: usize,
    pub store_connected: bool,
    pub sink_available: bool,
    pub allowed_domains: Vec<String>,
    pub current_time_utc: String,
}

/// The crawler engine
pub struct Engine {
    pub(crate) config: CrawlerConfig,
    pub(crate) allowed_domains: RwLock<Vec<String>>,
    pub(crate) client: reqwest::Client,
    pub(crate) frontier: Frontier,
    pub(crate) robots: RobotsChecker,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) bloom: UrlBloom,
    pub(crate) metrics: CrawlerMetrics,
    pub(crate) sinks: Vec<Arc<dyn DocumentSink>>,
    pub(crate) running: AtomicBool,
    cancel: StdMutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started_at: StdMutex<Option<Instant>>,
}

impl Engine {
    /// Builds an engine connected to the configured external store
    ///
    /// Fails on invalid configuration, an unreachable store, or an
    /// unreachable bus, so a broken deployment stops at startup.
    pub async fn new(config: CrawlerConfig) -> Result<Arc<Self>> {
        crate::config::validate(&config)?;
        let frontier = Frontier::connect(&config.store).await?;
        Self::with_frontier(config, frontier).await
    }

    /// Builds an engine over an injected store implementation
    pub async fn with_store(
        config: CrawlerConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Arc<Self>> {
        crate::config::validate(&config)?;
        Self::with_frontier(config, Frontier::new(store)).await
    }

    async fn with_frontier(config: CrawlerConfig, frontier: Frontier) -> Result<Arc<Self>> {
        let client = build_http_client(&config)?;

        let rate_limiter = Arc::new(RateLimiter::new(config.default_delay, &config.rate_limits));
        let robots = RobotsChecker::new(
            client.clone(),
            Arc::clone(&rate_limiter),
            config.user_agent.clone(),
            config.respect_robots_txt,
            config.robots_cache_time,
            config.request_timeout,
        );
        let bloom = UrlBloom::new(config.bloom_capacity, config.bloom_error_rate);

        let mut sinks: Vec<Arc<dyn DocumentSink>> = Vec::new();
        if config.enable_bus_output {
            let bus = BusSink::connect(&config.bus_brokers, &config.bus_topic).await?;
            sinks.push(Arc::new(bus));
        }
        if config.enable_local_save {
            sinks.push(Arc::new(FileSink::new(
                Path::new(&config.local_output_dir),
                &config.job_name,
            )));
        }

        tracing::info!(
            workers = config.workers,
            max_depth = config.max_depth,
            max_pages = config.max_pages,
            sinks = sinks.len(),
            "engine initialized"
        );

        Ok(Arc::new(Self {
            allowed_domains: RwLock::new(config.allowed_domains.clone()),
            client,
            frontier,
            robots,
            rate_limiter,
            bloom,
            metrics: CrawlerMetrics::new(),
            sinks,
            running: AtomicBool::new(false),
            cancel: StdMutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
            started_at: StdMutex::new(None),
            config,
        }))
    }

    /// Whether the engine is accepting and processing work
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The shared frontier this engine works against
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Runs the crawl to completion
    ///
    /// Loads seeds, spawns the worker pool and the metrics sampler, and
    /// returns once the engine has stopped (page cap, idle shutdown, or an
    /// explicit stop) and every task has drained.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CrawlerError::Engine("engine already running".to_string()));
        }

        let result = Self::run_inner(&self).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(engine: &Arc<Self>) -> Result<()> {
        {
            let mut started = engine.started_at.lock().unwrap_or_else(|e| e.into_inner());
            if started.is_none() {
                *started = Some(Instant::now());
            }
        }

        engine.derive_allowed_domains().await;

        let seeded = engine.load_seeds().await?;
        let queue_size = engine.frontier.size().await?;
        tracing::info!(seeded, queue_size, "starting crawl");
        if queue_size == 0 && seeded == 0 {
            tracing::warn!("starting with an empty queue and no seeds; waiting for add_urls");
        }

        Self::spawn_tasks(engine).await;
        engine.join_tasks().await;

        tracing::info!("crawl finished");
        Ok(())
    }

    /// Pauses the engine: workers drain, frontier state stays intact
    pub async fn pause(&self) {
        tracing::info!("pausing engine");
        self.running.store(false, Ordering::SeqCst);
        self.join_tasks().await;
    }

    /// Resumes a paused engine by re-spawning the worker pool
    pub async fn resume(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("resuming engine");
        Self::spawn_tasks(&self).await;
    }

    /// Stops the engine: cancels in-flight work and drains every task
    pub async fn stop(&self) {
        tracing::info!("stopping engine");
        self.running.store(false, Ordering::SeqCst);
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
        self.join_tasks().await;
    }

    /// Stops the engine and logs final statistics
    pub async fn close(&self) {
        self.stop().await;

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            pages_crawled = snapshot.pages_crawled,
            errors = snapshot.errors,
            robots_denied = snapshot.robots_denied,
            total_bytes = snapshot.total_bytes,
            uptime_seconds = snapshot.uptime_seconds,
            "engine closed"
        );
    }

    /// Admits URLs directly, outside link discovery
    ///
    /// Returns how many of the URLs were newly enqueued.
    pub async fn add_urls(&self, urls: &[String], priority: f64, depth: u32) -> Result<usize> {
        let mut added = 0;
        for url in urls {
            if self.frontier.add(url, priority, depth).await? {
                added += 1;
            }
        }
        tracing::info!(added, requested = urls.len(), "urls added");
        Ok(added)
    }

    /// Selectively clears frontier state and optionally the dedupe filter
    pub async fn reset(&self, sets: ClearOptions, clear_bloom: bool) -> Result<ResetReport> {
        let frontier = self.frontier.clear(sets).await?;
        if clear_bloom {
            self.bloom.clear();
        }
        Ok(ResetReport {
            frontier,
            bloom_cleared: clear_bloom,
        })
    }

    /// Current allowed-domains list
    pub async fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domains.read().await.clone()
    }

    /// Mutates the allowed-domains list
    pub async fn update_allowed_domains(&self, action: DomainAction, domains: &[String]) {
        let mut allowed = self.allowed_domains.write().await;
        match action {
            DomainAction::Add => {
                for domain in domains {
                    let domain = domain.to_lowercase();
                    if !domain.is_empty() && !allowed.contains(&domain) {
                        allowed.push(domain);
                    }
                }
            }
            DomainAction::Remove => {
                allowed.retain(|existing| !domains.iter().any(|d| d.eq_ignore_ascii_case(existing)));
            }
            DomainAction::Replace => {
                *allowed = domains
                    .iter()
                    .map(|d| d.to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect();
            }
        }
        tracing::info!(allowed = ?*allowed, "allowed domains updated");
    }

    /// Current metrics
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Builds a status snapshot; never fails, degraded subsystems report -1
    pub async fn status(&self) -> StatusSnapshot {
        let uptime = self
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let pages_crawled = self.metrics.pages_crawled();

        let queue_size = count_or_degraded(self.frontier.size().await);
        let processing_count = count_or_degraded(self.frontier.processing_count().await);
        let completed_count = count_or_degraded(self.frontier.completed_count().await);
        let seen_count = count_or_degraded(self.frontier.seen_count().await);

        StatusSnapshot {
            running: self.is_running(),
            uptime_seconds: uptime,
            pages_crawled,
            max_pages: self.config.max_pages,
            pages_remaining: (self.config.max_pages > 0)
                .then(|| self.config.max_pages.saturating_sub(pages_crawled)),
            avg_pages_per_second: if uptime > 0.0 {
                pages_crawled as f64 / uptime
            } else {
                0.0
            },
            queue_size,
            processing_count,
            completed_count,
            seen_count,
            bloom_items: self.bloom.count(),
            robots_denied: self.metrics.robots_denied(),
            errors: self.metrics.errors(),
            workers: self.config.workers,
            store_connected: self.frontier.is_connected().await,
            sink_available: !self.sinks.is_empty(),
            allowed_domains: self.allowed_domains.read().await.clone(),
            current_time_utc: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// When no domain restriction is configured, derive one from the seeds
    /// so a crawl seeded on one site does not wander off across the web.
    async fn derive_allowed_domains(&self) {
        {
            let allowed = self.allowed_domains.read().await;
            if !allowed.is_empty() {
                return;
            }
        }

        let mut derived: Vec<String> = Vec::new();
        for seed in self.seed_candidates() {
            if let Some(host) = canonicalize(&seed).and_then(|c| extract_host(&c)) {
                if !derived.contains(&host) {
                    derived.push(host);
                }
            }
        }

        if !derived.is_empty() {
            derived.sort();
            tracing::info!(domains = ?derived, "derived allowed domains from seeds");
            *self.allowed_domains.write().await = derived;
        }
    }

    /// Seed URLs from the config list and the optional seeds file
    fn seed_candidates(&self) -> Vec<String> {
        let mut seeds: Vec<String> = self
            .config
            .seed_urls
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(path) = &self.config.seed_urls_file {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    for line in content.lines() {
                        let line = line.trim();
                        if !line.is_empty() && !line.starts_with('#') {
                            seeds.push(line.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(path, error = %e, "failed to read seed file");
                }
            }
        }

        seeds
    }

    /// Canonicalizes, de-duplicates, and enqueues the seeds at priority 1.0
    async fn load_seeds(&self) -> Result<usize> {
        let mut processed = std::collections::HashSet::new();
        let mut added = 0;

        for seed in self.seed_candidates() {
            let Some(canonical) = canonicalize(&seed) else {
                tracing::warn!(seed, "skipping unparseable seed");
                continue;
            };
            if !processed.insert(canonical) {
                continue;
            }
            if self.frontier.add(&seed, 1.0, 0).await? {
                added += 1;
            }
        }

        if added > 0 {
            tracing::info!(added, "seed urls enqueued");
        }
        Ok(added)
    }

    /// Hands out the live cancellation token, minting a fresh one after a stop
    fn current_token(&self) -> CancellationToken {
        let mut token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    async fn spawn_tasks(engine: &Arc<Self>) {
        let token = engine.current_token();
        let mut tasks = engine.tasks.lock().await;

        for worker_id in 0..engine.config.workers {
            let engine = Arc::clone(engine);
            let token = token.clone();
            tasks.push(tokio::spawn(async move {
                engine.worker_loop(worker_id, token).await;
            }));
        }

        let engine = Arc::clone(engine);
        let sampler_token = token.clone();
        tasks.push(tokio::spawn(async move {
            engine.sampler_loop(sampler_token).await;
        }));
    }

    async fn join_tasks(&self) {
        loop {
            let task = {
                let mut tasks = self.tasks.lock().await;
                tasks.pop()
            };
            match task {
                Some(task) => {
                    let _ = task.await;
                }
                None => break,
            }
        }
    }

    /// Samples metrics on a fixed interval and triggers idle shutdown
    ///
    /// An idle sample is one where the queue and the processing set are both
    /// empty and no page completed since the previous sample. Enough
    /// consecutive idle samples mean the crawl has nothing left to do.
    async fn sampler_loop(self: Arc<Self>, token: CancellationToken) {
        let interval = Duration::from_secs(self.config.metrics_interval);
        let mut idle_samples = 0u32;
        let mut last_crawled = self.metrics.pages_crawled();

        tracing::debug!("metrics sampler started");
        while self.is_running() {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if !self.is_running() {
                break;
            }

            let (queue_size, processing) = match (
                self.frontier.size().await,
                self.frontier.processing_count().await,
            ) {
                (Ok(q), Ok(p)) => (q, p),
                (q, p) => {
                    tracing::error!(queue = ?q.err(), processing = ?p.err(), "sampler: store read failed");
                    continue;
                }
            };

            self.metrics.record_queue_sample(queue_size, processing);

            let crawled = self.metrics.pages_crawled();
            let snapshot = self.metrics.snapshot();
            tracing::info!(
                crawled,
                queue = queue_size,
                processing,
                errors = snapshot.errors,
                robots_denied = snapshot.robots_denied,
                rate = format!("{:.2}", snapshot.crawl_rate),
                "status"
            );

            if queue_size == 0 && processing == 0 && crawled == last_crawled {
                idle_samples += 1;
                tracing::debug!(idle_samples, "idle sample");
                if idle_samples >= self.config.idle_shutdown_threshold {
                    tracing::info!(
                        idle_samples,
                        "frontier empty and idle; initiating shutdown"
                    );
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            } else {
                idle_samples = 0;
            }
            last_crawled = crawled;
        }
        tracing::debug!("metrics sampler stopped");
    }
}

fn count_or_degraded(result: Result<u64>) -> i64 {
    match result {
        Ok(count) => count as i64,
        Err(_) => -1,
    }
}

/// Builds the shared HTTP client from configuration
pub fn build_http_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in &config.additional_headers {
        let name = match reqwest::header::HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                tracing::warn!(name, "skipping invalid header name");
                continue;
            }
        };
        match reqwest::header::HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(%name, "skipping invalid header value");
            }
        }
    }

    // Redirects are never followed by the client itself: robots.txt fetches
    // must stay single-request, and the same client serves them. The worker
    // chases Location headers manually when `allow_redirects` is on.
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(config.max_connections)
        .redirect(reqwest::redirect::Policy::none())
        .gzip(true)
        .brotli(true);

    if !config.ssl_verification_enabled {
        tracing::warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    } else if let Some(bundle) = &config.custom_ca_bundle {
        match std::fs::read(bundle) {
            Ok(pem) => match reqwest::Certificate::from_pem(&pem) {
                Ok(cert) => {
                    tracing::info!(bundle, "loaded custom CA bundle");
                    builder = builder.add_root_certificate(cert);
                }
                Err(e) => {
                    tracing::error!(bundle, error = %e, "invalid CA bundle; using default roots");
                }
            },
            Err(e) => {
                tracing::error!(bundle, error = %e, "CA bundle unreadable; using default roots");
            }
        }
    }

    Ok(builder.build()?)
}
