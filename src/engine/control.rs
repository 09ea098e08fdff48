//! Control surface
//!
//! The [`Controller`] is the one long-lived handle an outer service layer
//! keeps to a crawler process. Every operation returns a structured
//! [`ControlResponse`] instead of an error, so callers can always report an
//! outcome; [`Controller::status`] answers even when subsystems are
//! degraded.

use crate::engine::{Engine, StatusSnapshot};
use crate::frontier::{ClearOptions, ClearReport};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Structured outcome of a control operation
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub reason: String,
}

impl ControlResponse {
    pub fn ok(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
        }
    }
}

/// How [`Controller::update_allowed_domains`] changes the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainAction {
    Add,
    Remove,
    Replace,
}

/// Outcome of a reset operation
#[derive(Debug, Clone, Serialize)]
pub struct ResetReport {
    /// Per-key clearing details from the frontier
    pub frontier: ClearReport,

    /// Whether the in-process dedupe filter was cleared
    pub bloom_cleared: bool,
}

/// Long-lived handle driving one engine
pub struct Controller {
    engine: Arc<Engine>,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            run_task: Mutex::new(None),
        }
    }

    /// The engine behind this controller
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Starts the crawl in the background
    pub async fn start(&self) -> ControlResponse {
        let mut run_task = self.run_task.lock().await;

        if self.engine.is_running() {
            return ControlResponse::failed("engine is already running");
        }
        if let Some(task) = run_task.take() {
            // Reap a finished previous run
            if !task.is_finished() {
                *run_task = Some(task);
                return ControlResponse::failed("previous run is still draining");
            }
        }

        let engine = Arc::clone(&self.engine);
        *run_task = Some(tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                tracing::error!(error = %e, "crawl run failed");
            }
        }));

        ControlResponse::ok("crawler started")
    }

    /// Stops the crawl, cancelling in-flight work
    pub async fn stop(&self) -> ControlResponse {
        if !self.engine.is_running() {
            // Still drain a lingering run task so stop is safe to repeat
            self.engine.stop().await;
            self.reap_run_task().await;
            return ControlResponse::ok("engine was not running");
        }

        self.engine.stop().await;
        self.reap_run_task().await;
        ControlResponse::ok("crawler stopped")
    }

    /// Pauses the crawl; frontier state stays intact
    pub async fn pause(&self) -> ControlResponse {
        if !self.engine.is_running() {
            return ControlResponse::failed("engine is not running");
        }
        self.engine.pause().await;
        self.reap_run_task().await;
        ControlResponse::ok("crawler paused")
    }

    /// Resumes a paused crawl
    pub async fn resume(&self) -> ControlResponse {
        if self.engine.is_running() {
            return ControlResponse::failed("engine is already running");
        }
        Arc::clone(&self.engine).resume().await;
        ControlResponse::ok("crawler resumed")
    }

    /// Selectively clears crawl state
    pub async fn reset(&self, sets: ClearOptions, clear_bloom: bool) -> ControlResponse {
        match self.engine.reset(sets, clear_bloom).await {
            Ok(report) => ControlResponse::ok(format!(
                "cleared {} keys ({} existed), bloom_cleared={}",
                report.frontier.keys.len(),
                report.frontier.deleted,
                report.bloom_cleared
            )),
            Err(e) => ControlResponse::failed(format!("reset failed: {}", e)),
        }
    }

    /// Admits URLs, defaulting to priority 0.5 at depth 0
    pub async fn add_urls(
        &self,
        urls: &[String],
        priority: Option<f64>,
        depth: Option<u32>,
    ) -> ControlResponse {
        if urls.is_empty() {
            return ControlResponse::failed("no urls given");
        }
        let priority = priority.unwrap_or(0.5).clamp(0.0, 1.5);
        let depth = depth.unwrap_or(0);

        match self.engine.add_urls(urls, priority, depth).await {
            Ok(added) => {
                ControlResponse::ok(format!("added {} of {} urls", added, urls.len()))
            }
            Err(e) => ControlResponse::failed(format!("add failed: {}", e)),
        }
    }

    /// Always-available status snapshot
    pub async fn status(&self) -> StatusSnapshot {
        self.engine.status().await
    }

    /// Current allowed-domains list
    pub async fn allowed_domains(&self) -> Vec<String> {
        self.engine.allowed_domains().await
    }

    /// Mutates the allowed-domains list
    pub async fn update_allowed_domains(
        &self,
        action: DomainAction,
        domains: &[String],
    ) -> ControlResponse {
        if domains.is_empty() && action != DomainAction::Replace {
            return ControlResponse::failed("no domains given");
        }
        self.engine.update_allowed_domains(action, domains).await;
        let current = self.engine.allowed_domains().await;
        ControlResponse::ok(format!("allowed domains now: {:?}", current))
    }

    async fn reap_run_task(&self) {
        let task = self.run_task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}
