//! Stream-bus document sink
//!
//! Publishes each document as JSON onto a stream keyed by URL, so consumers
//! can partition and resume by stream position. Send failures surface as
//! `false`; retries are left to the consumer side of the bus.

use crate::sink::{Document, DocumentSink};
use crate::{CrawlerError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Stream publisher sink
pub struct BusSink {
    manager: ConnectionManager,
    topic: String,
}

impl BusSink {
    /// Connects to the bus at `brokers` (host:port) for the given topic
    pub async fn connect(brokers: &str, topic: &str) -> Result<Self> {
        let url = format!("redis://{}/", brokers);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CrawlerError::Sink(format!("bus connect failed: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CrawlerError::Sink(format!("bus connect failed: {}", e)))?;

        tracing::info!(brokers, topic, "bus sink connected");
        Ok(Self {
            manager,
            topic: topic.to_string(),
        })
    }

    /// Stream name documents are published to
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl DocumentSink for BusSink {
    fn name(&self) -> &str {
        "bus"
    }

    async fn emit(&self, document: &Document) -> bool {
        let payload = match serde_json::to_string(document) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(url = %document.url, error = %e, "bus sink: serialize failed");
                return false;
            }
        };

        let mut conn = self.manager.clone();
        let fields = [("url", document.url.as_str()), ("payload", payload.as_str())];
        let result: redis::RedisResult<String> =
            conn.xadd(self.topic.as_str(), "*", &fields).await;

        match result {
            Ok(_) => {
                tracing::debug!(url = %document.url, topic = %self.topic, "bus sink: published");
                true
            }
            Err(e) => {
                tracing::error!(url = %document.url, topic = %self.topic, error = %e, "bus sink: publish failed");
                false
            }
        }
    }
}
