//! Crawl metrics
//!
//! Counters are atomics; distributions live behind a mutex. Everything is
//! written from many workers at once and read by the periodic sampler and
//! the status endpoint, so reads always go through a point-in-time
//! [`MetricsSnapshot`].

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Cap on retained response-time and queue-size samples
const MAX_SAMPLES: usize = 10_000;

#[derive(Default)]
struct Distributions {
    status_codes: HashMap<u16, u64>,
    content_types: HashMap<String, u64>,
    response_times_ms: Vec<f64>,
    domains: HashSet<String>,
    queue_samples: Vec<QueueSample>,
}

/// Queue size observed at one sampler tick
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct QueueSample {
    /// Seconds since metrics start
    pub at_seconds: f64,
    pub queue_size: u64,
    pub processing: u64,
}

/// Point-in-time view of all metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub robots_denied: u64,
    pub errors: u64,
    pub total_bytes: u64,
    pub uptime_seconds: f64,
    /// Pages per second since start
    pub crawl_rate: f64,
    pub status_codes: HashMap<u16, u64>,
    pub content_types: HashMap<String, u64>,
    pub response_time_samples: usize,
    pub avg_response_time_ms: f64,
    pub domains_seen: usize,
    pub queue_samples: Vec<QueueSample>,
}

/// Shared crawl counters and distributions
pub struct CrawlerMetrics {
    pages_crawled: AtomicU64,
    pages_failed: AtomicU64,
    robots_denied: AtomicU64,
    errors: AtomicU64,
    total_bytes: AtomicU64,
    started_at: Mutex<Instant>,
    distributions: Mutex<Distributions>,
}

impl Default for CrawlerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerMetrics {
    pub fn new() -> Self {
        Self {
            pages_crawled: AtomicU64::new(0),
            pages_failed: AtomicU64::new(0),
            robots_denied: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            started_at: Mutex::new(Instant::now()),
            distributions: Mutex::new(Distributions::default()),
        }
    }

    pub fn incr_pages_crawled(&self) {
        self.pages_crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_pages_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_robots_denied(&self) {
        self.robots_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn pages_crawled(&self) -> u64 {
        self.pages_crawled.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn robots_denied(&self) -> u64 {
        self.robots_denied.load(Ordering::Relaxed)
    }

    pub fn record_status_code(&self, status: u16) {
        let mut dist = self.distributions();
        *dist.status_codes.entry(status).or_insert(0) += 1;
    }

    pub fn record_content_type(&self, content_type: &str) {
        // Bucket by media type, dropping charset parameters
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();
        if media_type.is_empty() {
            return;
        }
        let mut dist = self.distributions();
        *dist.content_types.entry(media_type).or_insert(0) += 1;
    }

    pub fn record_response_time(&self, millis: f64) {
        let mut dist = self.distributions();
        if dist.response_times_ms.len() < MAX_SAMPLES {
            dist.response_times_ms.push(millis);
        }
    }

    pub fn record_domain(&self, domain: &str) {
        let mut dist = self.distributions();
        if !dist.domains.contains(domain) {
            dist.domains.insert(domain.to_string());
        }
    }

    pub fn record_queue_sample(&self, queue_size: u64, processing: u64) {
        let at_seconds = self.uptime().as_secs_f64();
        let mut dist = self.distributions();
        if dist.queue_samples.len() < MAX_SAMPLES {
            dist.queue_samples.push(QueueSample {
                at_seconds,
                queue_size,
                processing,
            });
        }
    }

    fn uptime(&self) -> std::time::Duration {
        self.started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }

    fn distributions(&self) -> std::sync::MutexGuard<'_, Distributions> {
        self.distributions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Builds a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.uptime().as_secs_f64();
        let pages = self.pages_crawled();
        let dist = self.distributions();

        let avg_response_time_ms = if dist.response_times_ms.is_empty() {
            0.0
        } else {
            dist.response_times_ms.iter().sum::<f64>() / dist.response_times_ms.len() as f64
        };

        MetricsSnapshot {
            pages_crawled: pages,
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            robots_denied: self.robots_denied.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            crawl_rate: if uptime > 0.0 { pages as f64 / uptime } else { 0.0 },
            status_codes: dist.status_codes.clone(),
            content_types: dist.content_types.clone(),
            response_time_samples: dist.response_times_ms.len(),
            avg_response_time_ms,
            domains_seen: dist.domains.len(),
            queue_samples: dist.queue_samples.clone(),
        }
    }

    /// Zeros every counter and distribution and restarts the clock
    pub fn reset(&self) {
        self.pages_crawled.store(0, Ordering::Relaxed);
        self.pages_failed.store(0, Ordering::Relaxed);
        self.robots_denied.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.total_bytes.store(0, Ordering::Relaxed);
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        *self.distributions() = Distributions::default();
        tracing::info!("metrics reset");
    }
}
