//! Potator: a polite, concurrent web crawler
//!
//! This crate discovers and fetches pages reachable from a set of seed URLs,
//! honouring per-host politeness intervals and robots.txt rules while bounding
//! crawl depth and page volume.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Errors that stop a crawl engine from being built
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Failed to read allowed hosts file {path}: {source}")]
    AllowedHosts {
        path: String,
        source: std::io::Error,
    },
}

/// Errors surfaced by the page fetcher once its retries are exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Request {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("Failed to decode gzip body from {url}: {source}")]
    Decode {
        url: String,
        source: std::io::Error,
    },

    #[error("Fetch of {url} cancelled by shutdown")]
    Cancelled { url: String },
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlSummary, StopReason};
pub use frontier::{CrawlTask, Frontier};
pub use state::{FailureReason, SkipReason, TaskOutcome};
pub use crate::url::{host_of, normalize};
