use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_workers() -> usize {
    3
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages() -> u64 {
    4000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_delay() -> f64 {
    2.0
}

fn default_excluded_extensions() -> Vec<String> {
    [
        ".pdf", ".zip", ".rar", ".gz", ".tar", ".mp3", ".mp4", ".avi", ".mov", ".jpg", ".jpeg",
        ".png", ".gif", ".bmp", ".ico", ".css", ".js", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
        ".pptx", ".dmg", ".exe", ".msi", ".svg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_priority_patterns() -> Vec<String> {
    ["article", "post", "blog", "news", "story", "content", "product"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_content_types() -> Vec<String> {
    ["text/html", "application/xhtml+xml", "application/xml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_content_size() -> usize {
    10_485_760
}

fn default_robots_cache_time() -> u64 {
    3600
}

fn default_user_agent() -> String {
    "driftnet/0.3 (+https://github.com/driftnet/driftnet)".to_string()
}

fn default_bloom_capacity() -> u32 {
    10_000_000
}

fn default_bloom_error_rate() -> f64 {
    0.001
}

fn default_metrics_interval() -> u64 {
    60
}

fn default_idle_shutdown_threshold() -> u32 {
    3
}

fn default_bus_topic() -> String {
    "raw-documents".to_string()
}

fn default_local_output_dir() -> String {
    "./crawler_output".to_string()
}

fn default_job_name() -> String {
    "default".to_string()
}

fn default_store() -> StoreConfig {
    StoreConfig::default()
}

/// Connection settings for the external frontier store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Store host name
    pub host: String,

    /// Store port
    pub port: u16,

    /// Logical database index
    #[serde(default)]
    pub db: u32,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl StoreConfig {
    /// Builds the connection URL for this store
    pub fn url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{}@{}:{}/{}", pw, self.host, self.port, self.db),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Resolved crawler configuration
///
/// The engine consumes this struct as-is; loading and validation happen in
/// [`crate::config::load_config`]. Fields that may change at runtime
/// (`allowed_domains`, `rate_limits`) are copied behind locks by the engine;
/// everything else is frozen for the lifetime of a crawl.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Worker-pool size
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum link depth from seeds
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Page cap for the crawl; 0 means unlimited
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection pool cap for the HTTP client
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Whether the HTTP client follows redirects
    #[serde(default = "default_true")]
    pub allow_redirects: bool,

    /// Default spacing between requests to one domain, in seconds
    #[serde(default = "default_delay")]
    pub default_delay: f64,

    /// Per-domain delay overrides, in seconds
    #[serde(default)]
    pub rate_limits: HashMap<String, f64>,

    /// Hosts admitted to the crawl; empty means no restriction
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Seed URLs added at startup with priority 1.0
    #[serde(default)]
    pub seed_urls: Vec<String>,

    /// Optional file with one seed URL per line
    #[serde(default)]
    pub seed_urls_file: Option<String>,

    /// Path suffixes that are never enqueued
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,

    /// URL substrings that raise a discovered link's priority
    #[serde(default = "default_priority_patterns")]
    pub priority_patterns: Vec<String>,

    /// Content-Type substrings accepted for extraction
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,

    /// Maximum body size in bytes
    #[serde(default = "default_max_content_size")]
    pub max_content_size: usize,

    /// Whether robots.txt is consulted before fetching
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Robots.txt cache TTL in seconds
    #[serde(default = "default_robots_cache_time")]
    pub robots_cache_time: u64,

    /// User-Agent header and robots.txt agent name
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every request
    #[serde(default)]
    pub additional_headers: HashMap<String, String>,

    /// Whether TLS certificates are verified
    #[serde(default = "default_true")]
    pub ssl_verification_enabled: bool,

    /// Optional PEM bundle added to the trust roots
    #[serde(default)]
    pub custom_ca_bundle: Option<String>,

    /// Expected number of URLs for the dedupe filter
    #[serde(default = "default_bloom_capacity")]
    pub bloom_capacity: u32,

    /// Target false-positive rate for the dedupe filter
    #[serde(default = "default_bloom_error_rate")]
    pub bloom_error_rate: f64,

    /// Seconds between metrics samples
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval: u64,

    /// Consecutive idle samples before the engine shuts itself down
    #[serde(default = "default_idle_shutdown_threshold")]
    pub idle_shutdown_threshold: u32,

    /// Whether documents are published to the stream bus
    #[serde(default)]
    pub enable_bus_output: bool,

    /// Stream bus address, host:port
    #[serde(default)]
    pub bus_brokers: String,

    /// Stream name documents are published to
    #[serde(default = "default_bus_topic")]
    pub bus_topic: String,

    /// Whether documents are written to the local filesystem
    #[serde(default = "default_true")]
    pub enable_local_save: bool,

    /// Root directory for locally saved documents
    #[serde(default = "default_local_output_dir")]
    pub local_output_dir: String,

    /// Job name used for the per-job output subdirectory
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Frontier store connection settings
    #[serde(default = "default_store")]
    pub store: StoreConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            request_timeout: default_request_timeout(),
            max_connections: default_max_connections(),
            allow_redirects: true,
            default_delay: default_delay(),
            rate_limits: HashMap::new(),
            allowed_domains: Vec::new(),
            seed_urls: Vec::new(),
            seed_urls_file: None,
            excluded_extensions: default_excluded_extensions(),
            priority_patterns: default_priority_patterns(),
            allowed_content_types: default_allowed_content_types(),
            max_content_size: default_max_content_size(),
            respect_robots_txt: true,
            robots_cache_time: default_robots_cache_time(),
            user_agent: default_user_agent(),
            additional_headers: HashMap::new(),
            ssl_verification_enabled: true,
            custom_ca_bundle: None,
            bloom_capacity: default_bloom_capacity(),
            bloom_error_rate: default_bloom_error_rate(),
            metrics_interval: default_metrics_interval(),
            idle_shutdown_threshold: default_idle_shutdown_threshold(),
            enable_bus_output: false,
            bus_brokers: String::new(),
            bus_topic: default_bus_topic(),
            enable_local_save: true,
            local_output_dir: default_local_output_dir(),
            job_name: default_job_name(),
            store: StoreConfig::default(),
        }
    }
}
