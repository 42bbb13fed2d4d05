use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the crawler
///
/// Immutable for the duration of a crawl run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,

    /// Lower-cased hosts loaded from `crawler.allowedHostsFile`; empty means unrestricted
    #[serde(skip)]
    pub allowed_hosts: HashSet<String>,
}

/// Crawler behavior configuration, read from the `[crawler]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrawlerConfig {
    /// Stop after this many pages have been crawled
    pub max_pages: usize,

    /// Maximum link depth from a seed URL
    pub max_depth: u32,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Minimum time between fetch starts to the same host (milliseconds)
    pub politeness_ms: u64,

    /// Path to a newline-delimited list of hosts to restrict the crawl to
    pub allowed_hosts_file: Option<PathBuf>,

    /// Attempts made by the fetcher before giving up on I/O errors
    pub fetch_retries: u32,

    /// Base delay between fetch retries (milliseconds)
    pub fetch_backoff_ms: u64,

    /// Upper bound on a jittered retry delay (milliseconds)
    pub fetch_backoff_max_ms: u64,

    /// How retry delays grow between attempts
    pub fetch_backoff_strategy: BackoffStrategy,

    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,

    /// Seed URLs used when none are given on the command line
    pub seeds: Vec<String>,

    /// Number of concurrent worker tasks
    pub workers: usize,

    /// Directory (files backend) or database file parent (sqlite backend) for pages
    pub storage_dir: PathBuf,

    pub storage_backend: StorageBackend,

    /// SQLite file backing a durable frontier; in-memory when absent
    pub frontier_db: Option<PathBuf>,

    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub robots_timeout_ms: u64,

    /// Pages advertising a larger Content-Length are skipped
    pub max_body_bytes: u64,

    /// Seed the frontier from sitemaps advertised in robots.txt
    pub follow_sitemaps: bool,

    pub metrics_interval_secs: u64,
    pub supervisor_tick_ms: u64,
    pub empty_grace_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            max_depth: 2,
            user_agent: "PotatorCrawler/1.0".to_string(),
            politeness_ms: 500,
            allowed_hosts_file: None,
            fetch_retries: 3,
            fetch_backoff_ms: 500,
            fetch_backoff_max_ms: 30_000,
            fetch_backoff_strategy: BackoffStrategy::Linear,
            proxy_host: None,
            proxy_port: None,
            seeds: vec!["https://example.com".to_string()],
            workers: 4,
            storage_dir: PathBuf::from("./data"),
            storage_backend: StorageBackend::Files,
            frontier_db: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            robots_timeout_ms: 5_000,
            max_body_bytes: 1_000_000,
            follow_sitemaps: false,
            metrics_interval_secs: 30,
            supervisor_tick_ms: 250,
            empty_grace_ms: 1_000,
            shutdown_grace_ms: 10_000,
        }
    }
}

impl CrawlerConfig {
    pub fn politeness_interval(&self) -> Duration {
        Duration::from_millis(self.politeness_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_millis(self.robots_timeout_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn supervisor_tick(&self) -> Duration {
        Duration::from_millis(self.supervisor_tick_ms)
    }

    pub fn empty_grace(&self) -> Duration {
        Duration::from_millis(self.empty_grace_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Returns the HTTP proxy, if both host and port are configured
    pub fn proxy(&self) -> Option<ProxyConfig> {
        match (&self.proxy_host, self.proxy_port) {
            (Some(host), Some(port)) => Some(ProxyConfig {
                host: host.clone(),
                port,
            }),
            _ => None,
        }
    }
}

/// HTTP proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Where fetched pages are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One body file and one JSON metadata file per page
    #[default]
    Files,
    /// A single `pages.db` SQLite database
    Sqlite,
}

/// Delay growth between fetch retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base * attempt`
    #[default]
    Linear,
    /// Full-jitter exponential, capped at `fetchBackoffMaxMs`
    Jittered,
}
