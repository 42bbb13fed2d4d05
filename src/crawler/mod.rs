//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - HTML parsing and link extraction
//! - Sitemap reading
//! - The per-task worker state machine
//! - Overall crawl coordination

mod backoff;
mod coordinator;
mod fetcher;
mod parser;
mod sitemap;
mod worker;

pub use backoff::{compute_delay, envelope, Backoff, RetryPolicy};
pub use coordinator::{CrawlEngine, CrawlSummary, StopReason};
pub use fetcher::{build_http_client, decode_body, FetchResult, Fetcher};
pub use parser::{parse_html, HtmlParser, PageParser, ParsedPage};
pub use sitemap::{extract_locs, SitemapFetcher};
