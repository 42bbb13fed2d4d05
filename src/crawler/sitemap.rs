//! XML sitemap fetching
//!
//! Only `<loc>` values are read. Sitemap indexes are not followed: their
//! `<loc>` entries are returned like any other URL.

use crate::config::ProxyConfig;
use crate::crawler::fetcher::{build_http_client, decode_body};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;

/// Fetches sitemaps and lists the URLs they contain
#[derive(Debug, Clone)]
pub struct SitemapFetcher {
    client: Client,
}

impl SitemapFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, timeout, timeout, proxy)?;
        Ok(Self { client })
    }

    /// Returns every `<loc>` in the sitemap at `url`
    ///
    /// Any fetch, status or XML error yields an empty list.
    pub async fn fetch(&self, url: &str) -> Vec<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!("Sitemap {} returned HTTP {}", url, response.status().as_u16());
                return Vec::new();
            }
            Err(e) => {
                tracing::debug!("Sitemap {} unavailable: {}", url, e);
                return Vec::new();
            }
        };

        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::debug!("Failed to read sitemap {}: {}", url, e);
                return Vec::new();
            }
        };

        let body = match decode_body(&headers, body) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to decode sitemap {}: {}", url, e);
                return Vec::new();
            }
        };

        match extract_locs(&String::from_utf8_lossy(&body)) {
            Ok(locs) => {
                tracing::debug!("Sitemap {} lists {} URL(s)", url, locs.len());
                locs
            }
            Err(e) => {
                tracing::debug!("Malformed sitemap {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

/// Collects the text of every `<loc>` element
pub fn extract_locs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            Event::Text(e) if in_loc => {
                current.push_str(&e.unescape()?);
            }
            Event::CData(e) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(locs)
}
