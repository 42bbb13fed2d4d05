//! Robots.txt caching implementation
//!
//! Rules are memoized per `scheme://host[:port]` for the lifetime of the crawl.
//! Each key is populated at most once; concurrent first lookups for the same
//! key wait on a single fetch.

use crate::robots::{RobotsFetcher, RobotsRules};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Compute-once-per-host robots.txt cache
#[derive(Debug)]
pub struct RobotsCache {
    fetcher: RobotsFetcher,
    entries: DashMap<String, Arc<OnceCell<Arc<RobotsRules>>>>,
}

impl RobotsCache {
    pub fn new(fetcher: RobotsFetcher) -> Self {
        Self {
            fetcher,
            entries: DashMap::new(),
        }
    }

    /// Returns the rules governing `url`
    ///
    /// A URL that cannot be parsed, or has no host, is governed by an
    /// allow-all policy that is not cached.
    pub async fn rules_for(&self, url: &str) -> Arc<RobotsRules> {
        let Some(parsed) = parse_with_default_scheme(url) else {
            return Arc::new(RobotsRules::allow_all());
        };
        let Some(host) = parsed.host_str() else {
            return Arc::new(RobotsRules::allow_all());
        };

        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let key = format!("{}://{}", parsed.scheme(), authority);

        // The map guard is released before awaiting the cell
        let cell = self.entries.entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| async {
            Arc::new(
                self.fetcher
                    .fetch_for_host(parsed.scheme(), &authority)
                    .await,
            )
        })
        .await
        .clone()
    }

    /// Checks whether the path of `url` is allowed
    ///
    /// The query string is not part of the match.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Some(parsed) = parse_with_default_scheme(url) else {
            return true;
        };
        let rules = self.rules_for(url).await;
        let path = match parsed.path() {
            "" => "/",
            path => path,
        };
        rules.is_allowed(path)
    }

    /// Number of hosts with a cache entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_with_default_scheme(url: &str) -> Option<Url> {
    Url::parse(&crate::url::normalize(url)).ok()
}
