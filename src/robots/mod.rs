//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Only `User-agent: *` groups, `Disallow:` and `Sitemap:`
//! directives are honoured.

mod cache;
mod fetcher;
mod parser;

pub use cache::RobotsCache;
pub use fetcher::RobotsFetcher;
pub use parser::RobotsRules;
