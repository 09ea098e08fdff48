//! Document sinks
//!
//! Every successfully fetched page becomes a [`Document`] and is offered to
//! each enabled sink exactly once per fetch. Sinks decide their own
//! durability; the engine only records failures. Both reference adapters
//! are here: a stream-bus publisher and a one-file-per-document filesystem
//! writer.

mod bus;
mod file;

pub use bus::BusSink;
pub use file::FileSink;

use crate::extract::ImageInfo;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

/// A fetched page as emitted downstream
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Canonical URL the content was fetched from (after redirects)
    pub url: String,

    /// Fetch time, ISO-8601 UTC
    pub fetched_at: String,

    /// HTTP status of the final response
    pub status_code: u16,

    /// Content-Type header of the final response
    pub content_type: String,

    /// Raw HTML body
    pub content: String,

    /// Canonical absolute links extracted from the body
    pub links: Vec<String>,

    /// Response headers
    pub headers: HashMap<String, String>,

    /// Link depth from the seeds
    pub depth: u32,

    /// Extracted page title
    pub title: Option<String>,

    /// Extracted meta description
    pub meta_description: Option<String>,

    /// OpenGraph and document metadata
    pub metadata: HashMap<String, String>,

    /// Images referenced by the page
    pub images: Vec<ImageInfo>,

    /// Visible-text preview
    pub text_preview: String,

    /// The URL originally requested, when a redirect changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_request_url: Option<String>,
}

/// Result of a batch emission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub success_count: usize,
    pub failure_count: usize,
}

/// Outbound interface for fetched documents
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Short name for logs and status reporting
    fn name(&self) -> &str;

    /// Persists one document; false on failure
    ///
    /// Implementations log their own failures. The engine does not retry.
    async fn emit(&self, document: &Document) -> bool;

    /// Persists a batch, counting outcomes
    async fn emit_batch(&self, documents: &[Document]) -> BatchReport {
        let mut report = BatchReport::default();
        for document in documents {
            if self.emit(document).await {
                report.success_count += 1;
            } else {
                report.failure_count += 1;
            }
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builds a minimal document for sink tests
    pub fn document(url: &str) -> Document {
        Document {
            url: url.to_string(),
            fetched_at: "2024-05-01T12:00:00+00:00".to_string(),
            status_code: 200,
            content_type: "text/html".to_string(),
            content: "<html><body>hi</body></html>".to_string(),
            links: vec!["https://example.com/next".to_string()],
            headers: HashMap::new(),
            depth: 1,
            title: Some("Hi".to_string()),
            meta_description: None,
            metadata: HashMap::new(),
            images: Vec::new(),
            text_preview: "hi".to_string(),
            original_request_url: None,
        }
    }
}
