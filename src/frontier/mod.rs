//! Distributed URL frontier
//!
//! The frontier is the shared work queue for every crawler process: a
//! priority-ordered queue of URL records plus three membership sets
//! (`seen`, `processing`, `completed`) living in an external key-value
//! store under fixed key names, so processes in any language can cooperate
//! on one crawl.
//!
//! The four structures are not transactionally linked. `add` uses the
//! seen-set insert as its election point, so two processes racing on one
//! URL produce exactly one queue entry; `pop` uses the processing-set
//! insert the same way. A crash between the queue pop and the processing
//! insert can lose a URL until rediscovery; a crash before completion can
//! leave one stuck in `processing` until an operator clears that set.

mod memory;
mod redis;
mod store;

pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use store::{KeyValueStore, COMPLETED_KEY, PROCESSING_KEY, QUEUE_KEY, SEEN_KEY};

use crate::config::StoreConfig;
use crate::url::{canonicalize, extract_host};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A queued URL with its crawl bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlRecord {
    /// Canonical URL; the unique key in every frontier structure
    pub url: String,

    /// The URL as it was handed to `add`, for diagnostics
    pub original_url: String,

    /// Scheduling priority in [0.0, 1.5]; larger pops sooner
    pub priority: f64,

    /// Link depth from the seeds
    pub depth: u32,

    /// Epoch seconds when the record was admitted
    pub added_at: f64,

    /// Host of the canonical URL
    pub domain: String,
}

impl UrlRecord {
    /// Queue score: priority dominates, admission time breaks ties older-first
    pub fn score(&self) -> f64 {
        -self.priority + self.added_at * 1e-9
    }
}

/// Which frontier structures a [`Frontier::clear`] call drops
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearOptions {
    pub queue: bool,
    pub seen: bool,
    pub processing: bool,
    pub completed: bool,
}

impl ClearOptions {
    /// Selects every structure
    pub fn all() -> Self {
        Self {
            queue: true,
            seen: true,
            processing: true,
            completed: true,
        }
    }
}

/// Outcome of a clear operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClearReport {
    /// Store keys that were dropped
    pub keys: Vec<String>,

    /// Entry counts per key, taken just before deletion
    pub counts: HashMap<String, u64>,

    /// Number of keys that actually existed
    pub deleted: u64,
}

/// Handle to the shared URL frontier
#[derive(Clone)]
pub struct Frontier {
    store: Arc<dyn KeyValueStore>,
}

impl Frontier {
    /// Wraps an already-connected store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Connects to the Redis store described by `config`
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let store = RedisStore::connect(config).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Admits a URL to the frontier
    ///
    /// Canonicalizes first; invalid URLs are rejected. A URL already
    /// completed or already seen is rejected, and the seen-set insert is the
    /// commit: of two processes racing on the same URL exactly one enqueues
    /// it.
    ///
    /// # Arguments
    ///
    /// * `url` - URL in any admissible form
    /// * `priority` - Scheduling priority in [0.0, 1.5]
    /// * `depth` - Link depth from the seeds
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was enqueued
    /// * `Ok(false)` - Invalid, already seen, or already completed
    pub async fn add(&self, url: &str, priority: f64, depth: u32) -> Result<bool> {
        let Some(canonical) = canonicalize(url) else {
            tracing::debug!(url, "frontier: rejected invalid url");
            return Ok(false);
        };

        if self.store.set_contains(COMPLETED_KEY, &canonical).await? {
            tracing::trace!(url = %canonical, "frontier: already completed");
            return Ok(false);
        }

        if !self.store.set_add(SEEN_KEY, &canonical).await? {
            tracing::trace!(url = %canonical, "frontier: already seen");
            return Ok(false);
        }

        let record = UrlRecord {
            domain: extract_host(&canonical).unwrap_or_default(),
            url: canonical,
            original_url: url.to_string(),
            priority,
            depth,
            added_at: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        };

        let payload = serde_json::to_string(&record)?;
        self.store
            .zset_add(QUEUE_KEY, &payload, record.score())
            .await?;
        tracing::debug!(url = %record.url, priority, depth, "frontier: enqueued");
        Ok(true)
    }

    /// Takes the highest-priority URL off the queue
    ///
    /// The popped URL is moved into `processing`. Entries that lost a race
    /// (already processing) or completed while queued are discarded and the
    /// next entry is tried.
    pub async fn pop(&self) -> Result<Option<UrlRecord>> {
        loop {
            let Some((payload, _score)) = self.store.zset_pop_min(QUEUE_KEY).await? else {
                return Ok(None);
            };

            let record: UrlRecord = match serde_json::from_str(&payload) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "frontier: dropping undecodable queue entry");
                    continue;
                }
            };

            if self.store.set_contains(COMPLETED_KEY, &record.url).await? {
                tracing::trace!(url = %record.url, "frontier: dropping completed queue entry");
                continue;
            }

            if self.store.set_add(PROCESSING_KEY, &record.url).await? {
                return Ok(Some(record));
            }
            tracing::trace!(url = %record.url, "frontier: lost pop race, retrying");
        }
    }

    /// Records a terminal outcome for a URL. Idempotent.
    pub async fn mark_completed(&self, url: &str) -> Result<()> {
        self.store.set_remove(PROCESSING_KEY, url).await?;
        self.store.set_add(COMPLETED_KEY, url).await?;
        Ok(())
    }

    /// Releases a failed URL's processing claim
    ///
    /// The URL is not re-enqueued: its `seen` membership blocks re-admission
    /// until an operator resets that set.
    pub async fn mark_failed(&self, url: &str, depth: u32) -> Result<()> {
        self.store.set_remove(PROCESSING_KEY, url).await?;
        tracing::debug!(url, depth, "frontier: marked failed");
        Ok(())
    }

    /// Drops a URL's processing claim without any terminal outcome
    pub async fn release_processing(&self, url: &str) -> Result<()> {
        self.store.set_remove(PROCESSING_KEY, url).await?;
        Ok(())
    }

    /// Whether a URL has reached a terminal outcome
    pub async fn is_completed(&self, url: &str) -> Result<bool> {
        match canonicalize(url) {
            Some(canonical) => self.store.set_contains(COMPLETED_KEY, &canonical).await,
            None => Ok(false),
        }
    }

    /// Number of queued entries
    pub async fn size(&self) -> Result<u64> {
        self.store.zset_len(QUEUE_KEY).await
    }

    /// Number of URLs currently claimed by workers
    pub async fn processing_count(&self) -> Result<u64> {
        self.store.set_len(PROCESSING_KEY).await
    }

    /// Number of URLs with a terminal outcome
    pub async fn completed_count(&self) -> Result<u64> {
        self.store.set_len(COMPLETED_KEY).await
    }

    /// Number of URLs ever admitted
    pub async fn seen_count(&self) -> Result<u64> {
        self.store.set_len(SEEN_KEY).await
    }

    /// Selectively drops frontier structures
    pub async fn clear(&self, options: ClearOptions) -> Result<ClearReport> {
        let mut report = ClearReport::default();

        if options.completed {
            report.counts.insert(
                COMPLETED_KEY.to_string(),
                self.store.set_len(COMPLETED_KEY).await?,
            );
            report.keys.push(COMPLETED_KEY.to_string());
        }
        if options.seen {
            report
                .counts
                .insert(SEEN_KEY.to_string(), self.store.set_len(SEEN_KEY).await?);
            report.keys.push(SEEN_KEY.to_string());
        }
        if options.processing {
            report.counts.insert(
                PROCESSING_KEY.to_string(),
                self.store.set_len(PROCESSING_KEY).await?,
            );
            report.keys.push(PROCESSING_KEY.to_string());
        }
        if options.queue {
            report
                .counts
                .insert(QUEUE_KEY.to_string(), self.store.zset_len(QUEUE_KEY).await?);
            report.keys.push(QUEUE_KEY.to_string());
        }

        if !report.keys.is_empty() {
            let keys: Vec<&str> = report.keys.iter().map(String::as_str).collect();
            report.deleted = self.store.delete(&keys).await?;
            tracing::info!(keys = ?report.keys, deleted = report.deleted, "frontier: cleared");
        }

        Ok(report)
    }

    /// Drops all four frontier structures
    pub async fn clear_all(&self) -> Result<()> {
        self.clear(ClearOptions::all()).await?;
        Ok(())
    }

    /// Whether the backing store answers
    pub async fn is_connected(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}
