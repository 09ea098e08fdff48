//! Configuration module
//!
//! Loads, parses, and validates TOML configuration files into the frozen
//! [`CrawlerConfig`] struct the engine consumes.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{CrawlerConfig, StoreConfig};
pub use validation::validate;
