//! Driftnet: a distributed web-crawler core
//!
//! This crate implements the crawling core shared by a fleet of crawler
//! processes: a prioritized URL frontier backed by an external key-value
//! store, a worker pool running the fetch-parse-enqueue pipeline, per-domain
//! politeness with robots.txt support, and document emission to pluggable
//! sinks.

pub mod bloom;
pub mod config;
pub mod engine;
pub mod extract;
pub mod frontier;
pub mod metrics;
pub mod ratelimit;
pub mod robots;
pub mod sink;
pub mod url;

use thiserror::Error;

/// Main error type for driftnet operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for driftnet operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::CrawlerConfig;
pub use engine::{Controller, Engine, StatusSnapshot};
pub use frontier::{Frontier, UrlRecord};
pub use sink::Document;
