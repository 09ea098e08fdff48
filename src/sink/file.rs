//! Filesystem document sink
//!
//! Writes one JSON file per document under
//! `<root>/documents/<job>/<host>_<path>_<hash>.json`. The hash is the
//! first 8 hex characters of the MD5 of the canonical URL, keeping names
//! unique across pages whose host and path flatten to the same string.
//! Collisions overwrite, so a re-crawl refreshes the stored copy.

use crate::sink::{Document, DocumentSink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// One-JSON-file-per-document sink
pub struct FileSink {
    job_dir: PathBuf,
}

impl FileSink {
    /// Creates a sink rooted at `root` for the given job
    pub fn new(root: &Path, job_name: &str) -> Self {
        let job_dir = root.join("documents").join(sanitize_job_name(job_name));
        Self { job_dir }
    }

    /// Directory this sink writes into
    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    /// Target path for a document
    pub fn document_path(&self, url: &str) -> PathBuf {
        self.job_dir.join(safe_file_name(url))
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn emit(&self, document: &Document) -> bool {
        let path = self.document_path(&document.url);

        if let Err(e) = tokio::fs::create_dir_all(&self.job_dir).await {
            tracing::error!(dir = %self.job_dir.display(), error = %e, "file sink: mkdir failed");
            return false;
        }

        let payload = match serde_json::to_string_pretty(document) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(url = %document.url, error = %e, "file sink: serialize failed");
                return false;
            }
        };

        match tokio::fs::write(&path, payload).await {
            Ok(()) => {
                tracing::debug!(url = %document.url, path = %path.display(), "file sink: saved");
                true
            }
            Err(e) => {
                tracing::error!(url = %document.url, path = %path.display(), error = %e, "file sink: write failed");
                false
            }
        }
    }
}

/// Replaces anything outside `[A-Za-z0-9_-]` and caps the length at 64
fn sanitize_job_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect()
}

/// Flattens a URL into `<host>_<path>_<md5-8>.json`
fn safe_file_name(url: &str) -> String {
    let (host, path) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("unknown").replace('.', "_"),
            parsed.path().replace('/', "_").replace('.', "_"),
        ),
        Err(_) => ("unknown".to_string(), "_".to_string()),
    };

    let path = if path.is_empty() || path == "_" {
        "index".to_string()
    } else {
        path
    };

    let digest = format!("{:x}", md5::compute(url.as_bytes()));
    format!("{}_{}_{}.json", host, path, &digest[..8])
}
