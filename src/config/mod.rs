//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file. A missing file is not an error: the built-in defaults are used instead.
//!
//! # Example
//!
//! ```no_run
//! use potator_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will stop after {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BackoffStrategy, Config, CrawlerConfig, ProxyConfig, StorageBackend};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_allowed_hosts};
pub use validation::validate;
