//! Robots.txt fetching
//!
//! Unavailability of robots.txt is never a crawl error: any failure yields an
//! allow-all policy.

use crate::config::ProxyConfig;
use crate::crawler::build_http_client;
use crate::robots::RobotsRules;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Fetches and parses `/robots.txt` for a host
#[derive(Debug, Clone)]
pub struct RobotsFetcher {
    client: Client,
}

impl RobotsFetcher {
    /// Builds a fetcher whose connect and read timeouts are both `timeout`
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, timeout, timeout, proxy)?;
        Ok(Self { client })
    }

    /// Fetches `scheme://host/robots.txt` and parses it
    ///
    /// `host` may carry a port. Non-200 responses, network errors and timeouts
    /// all produce [`RobotsRules::allow_all`].
    pub async fn fetch_for_host(&self, scheme: &str, host: &str) -> RobotsRules {
        let robots_url = format!("{}://{}/robots.txt", scheme, host);
        tracing::debug!("Fetching {}", robots_url);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt unavailable at {}: {}", robots_url, e);
                return RobotsRules::allow_all();
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "robots.txt at {} returned HTTP {}, allowing all",
                robots_url,
                response.status().as_u16()
            );
            return RobotsRules::allow_all();
        }

        match response.text().await {
            Ok(body) => {
                let rules = RobotsRules::parse(&body);
                tracing::debug!(
                    "robots.txt for {}: {} disallow rule(s), {} sitemap(s)",
                    host,
                    rules.disallow_prefixes().len(),
                    rules.sitemap_urls().len()
                );
                rules
            }
            Err(e) => {
                tracing::debug!("Failed to read robots.txt body from {}: {}", robots_url, e);
                RobotsRules::allow_all()
            }
        }
    }
}
