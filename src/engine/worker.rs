//! Worker loop and per-URL pipeline
//!
//! Each worker repeatedly pops a URL record and runs it through the gates:
//! completed check, local dedupe, robots, rate limit, fetch, content
//! filters, extraction, emission, and child enqueueing. Per-URL failures
//! are recorded and swallowed; the loop always returns to the queue.

use crate::engine::Engine;
use crate::frontier::UrlRecord;
use crate::sink::Document;
use crate::url::{canonicalize, extract_host, is_valid_for_crawl};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Hop cap when following redirects manually
const MAX_REDIRECTS: usize = 10;

/// Tracks URLs visited while following a redirect chain
struct RedirectChain {
    visited: HashSet<String>,
}

impl RedirectChain {
    fn new() -> Self {
        Self {
            visited: HashSet::new(),
        }
    }

    /// Records a hop; false means the URL was already visited (a loop)
    fn add(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    fn is_too_long(&self) -> bool {
        self.visited.len() > MAX_REDIRECTS
    }
}

/// A failed page fetch, classified for logging
struct FetchFailure {
    timeout: bool,
    message: String,
}

impl From<reqwest::Error> for FetchFailure {
    fn from(e: reqwest::Error) -> Self {
        Self {
            timeout: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

impl FetchFailure {
    fn redirect(message: String) -> Self {
        Self {
            timeout: false,
            message,
        }
    }
}

impl Engine {
    pub(crate) async fn worker_loop(&self, worker_id: usize, token: CancellationToken) {
        tracing::info!(worker_id, "worker started");

        while self.is_running() {
            if self.config.max_pages > 0
                && self.metrics.pages_crawled() >= self.config.max_pages
            {
                tracing::info!(
                    worker_id,
                    max_pages = self.config.max_pages,
                    "page cap reached; stopping"
                );
                self.running.store(false, Ordering::SeqCst);
                break;
            }

            let popped = tokio::select! {
                _ = token.cancelled() => break,
                result = self.frontier.pop() => result,
            };

            let record = match popped {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "frontier pop failed");
                    self.metrics.incr_errors();
                    if !self.frontier.is_connected().await {
                        tracing::error!("frontier store unreachable; stopping engine");
                        self.running.store(false, Ordering::SeqCst);
                        break;
                    }
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                    continue;
                }
            };

            let url = record.url.clone();
            tokio::select! {
                _ = token.cancelled() => {
                    // Stop reached mid-claim; give the URL back to the
                    // processing-recovery path instead of holding it
                    let _ = self.frontier.release_processing(&url).await;
                    break;
                }
                result = self.process(record) => {
                    if let Err(e) = result {
                        tracing::error!(worker_id, url, error = %e, "processing failed");
                        self.metrics.incr_errors();
                        let _ = self.frontier.release_processing(&url).await;
                    }
                }
            }
        }

        tracing::info!(worker_id, "worker stopped");
    }

    /// Runs one URL through the full pipeline
    ///
    /// Errors escaping this function are store failures; everything per-URL
    /// (fetch errors, filters, robots denials) is terminal here.
    pub(crate) async fn process(&self, record: UrlRecord) -> Result<()> {
        let url = record.url.clone();
        let depth = record.depth;

        if self.frontier.is_completed(&url).await? {
            self.frontier.release_processing(&url).await?;
            return Ok(());
        }

        if self.bloom.contains(&url) {
            tracing::trace!(url, "already processed locally");
            return Ok(());
        }

        if !self.robots.can_fetch(&self.config.user_agent, &url).await {
            tracing::info!(url, "denied by robots.txt");
            self.metrics.incr_robots_denied();
            self.frontier.mark_completed(&url).await?;
            self.bloom.add(&url);
            return Ok(());
        }

        let domain = extract_host(&url).unwrap_or_default();
        self.rate_limiter.wait(&domain).await;
        if !domain.is_empty() {
            self.metrics.record_domain(&domain);
        }

        tracing::debug!(url, depth, "fetching");
        let fetch_started = Instant::now();
        let response = match self.fetch_with_redirects(&url).await {
            Ok(response) => response,
            Err(failure) => {
                if failure.timeout {
                    tracing::warn!(url, "fetch timed out");
                } else {
                    tracing::warn!(url, error = %failure.message, "fetch failed");
                }
                self.metrics.incr_errors();
                self.metrics.incr_pages_failed();
                self.frontier.mark_failed(&url, depth).await?;
                self.bloom.add(&url);
                return Ok(());
            }
        };
        self.metrics
            .record_response_time(fetch_started.elapsed().as_secs_f64() * 1000.0);

        let status_code = response.status().as_u16();
        self.metrics.record_status_code(status_code);

        let final_url = canonicalize(response.url().as_str()).unwrap_or_else(|| url.clone());
        let redirected = final_url != url;

        if redirected && self.frontier.is_completed(&final_url).await? {
            tracing::debug!(url, final_url, "redirect target already completed");
            self.frontier.mark_completed(&url).await?;
            self.bloom.add(&url);
            self.bloom.add(&final_url);
            return Ok(());
        }

        self.bloom.add(&url);
        if redirected {
            self.bloom.add(&final_url);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| content_type.contains(&allowed.to_lowercase()))
        {
            tracing::debug!(url = final_url, content_type, "filtered by content type");
            self.finish(&final_url, &url, redirected).await?;
            return Ok(());
        }
        self.metrics.record_content_type(&content_type);

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = final_url, error = %e, "body read failed");
                self.metrics.incr_errors();
                self.metrics.incr_pages_failed();
                self.frontier.mark_failed(&url, depth).await?;
                self.bloom.add(&url);
                return Ok(());
            }
        };

        let content_size = body.len();
        if content_size > self.config.max_content_size {
            tracing::debug!(url = final_url, content_size, "filtered by size");
            self.finish(&final_url, &url, redirected).await?;
            return Ok(());
        }
        self.metrics.add_bytes(content_size as u64);

        // Extraction cannot fail; broken markup degrades to an empty record
        let extraction = crate::extract::extract(&body, &final_url);

        let document = Document {
            url: final_url.clone(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
            status_code,
            content_type,
            content: body,
            links: extraction.links.clone(),
            headers,
            depth,
            title: extraction.title,
            meta_description: extraction.meta_description,
            metadata: extraction.metadata,
            images: extraction.images,
            text_preview: extraction.text_preview,
            original_request_url: redirected.then(|| url.clone()),
        };

        for sink in &self.sinks {
            if !sink.emit(&document).await {
                tracing::error!(url = final_url, sink = sink.name(), "sink emit failed");
                self.metrics.incr_errors();
            }
        }

        self.metrics.incr_pages_crawled();
        tracing::info!(
            url = final_url,
            depth,
            links = extraction.links.len(),
            crawled = self.metrics.pages_crawled(),
            "page crawled"
        );

        self.finish(&final_url, &url, redirected).await?;

        if depth < self.config.max_depth {
            self.enqueue_children(&extraction.links, depth + 1).await?;
        }

        Ok(())
    }

    /// Fetches a page, chasing redirects by hand
    ///
    /// The shared client never follows redirects on its own (robots.txt
    /// fetches ride the same client and must stay single-request), so hop
    /// chasing happens here: at most [`MAX_REDIRECTS`] hops, loop detection
    /// over visited URLs, relative Location values resolved against the
    /// current URL. With `allow_redirects` off the first response comes back
    /// as-is, whatever its status.
    async fn fetch_with_redirects(
        &self,
        url: &str,
    ) -> std::result::Result<reqwest::Response, FetchFailure> {
        let mut chain = RedirectChain::new();
        let mut current = url.to_string();

        loop {
            if !chain.add(&current) {
                return Err(FetchFailure::redirect(format!(
                    "redirect loop at {}",
                    current
                )));
            }
            if chain.is_too_long() {
                return Err(FetchFailure::redirect(format!(
                    "too many redirects (max {})",
                    MAX_REDIRECTS
                )));
            }

            let response = self.client.get(&current).send().await?;
            if !response.status().is_redirection() || !self.config.allow_redirects {
                return Ok(response);
            }

            let Some(location) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Err(FetchFailure::redirect(format!(
                    "redirect without Location header at {}",
                    current
                )));
            };

            let next = url::Url::parse(&current)
                .and_then(|base| base.join(location))
                .map_err(|_| {
                    FetchFailure::redirect(format!(
                        "invalid redirect target '{}' at {}",
                        location, current
                    ))
                })?;

            tracing::debug!(url = current, target = %next, "following redirect");
            current = next.to_string();
        }
    }

    /// Marks a terminal outcome for the fetched URL (and the original
    /// request URL when a redirect split them)
    async fn finish(&self, final_url: &str, requested_url: &str, redirected: bool) -> Result<()> {
        self.frontier.mark_completed(final_url).await?;
        if redirected {
            self.frontier.mark_completed(requested_url).await?;
        }
        Ok(())
    }

    /// Enqueues extracted links after validity and dedupe checks
    async fn enqueue_children(&self, links: &[String], child_depth: u32) -> Result<()> {
        let allowed = self.allowed_domains.read().await.clone();
        let mut added = 0;

        for link in links {
            if !is_valid_for_crawl(link, &allowed, &self.config.excluded_extensions) {
                continue;
            }
            if self.bloom.contains(link) {
                continue;
            }
            if self.frontier.is_completed(link).await? {
                continue;
            }

            let priority = self.child_priority(link, child_depth);
            if self.frontier.add(link, priority, child_depth).await? {
                added += 1;
            }
        }

        if added > 0 {
            tracing::debug!(added, child_depth, "links enqueued");
        }
        Ok(())
    }

    /// Priority for a discovered link: decays with depth, boosted when the
    /// URL matches a configured pattern, clamped to [0.01, 1.5]
    pub(crate) fn child_priority(&self, url: &str, depth: u32) -> f64 {
        let mut priority = 1.0 - 0.1 * depth as f64;
        let url_lower = url.to_lowercase();
        if self
            .config
            .priority_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && url_lower.contains(&pattern.to_lowercase()))
        {
            priority += 0.5;
        }
        priority.clamp(0.01, 1.5)
    }
}
