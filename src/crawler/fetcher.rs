//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building HTTP clients with the configured user agent, timeouts and proxy
//! - GET requests with redirect following
//! - Retry with backoff on I/O-level failures
//! - gzip body decoding

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::crawler::backoff::RetryPolicy;
use crate::FetchError;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::borrow::Cow;
use std::io::Read;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Response of one successful exchange with a server
///
/// Any status code counts as a successful exchange; classifying it is the
/// caller's job.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status_code: u16,
    /// Body bytes, gzip-decoded when the response was gzip-encoded
    pub body: Vec<u8>,
    /// URL after redirects
    pub final_url: String,
    pub content_type: Option<String>,
    /// Advertised `Content-Length`, if any
    pub content_length: Option<u64>,
}

impl FetchResult {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the content type names an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml+xml")
            })
            .unwrap_or(false)
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed automatically (up to ten hops). gzip is decoded by
/// [`decode_body`] rather than by the client, so `Content-Encoding` survives
/// to the caller.
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header
/// * `connect_timeout` - Limit on establishing a connection
/// * `request_timeout` - Limit on the whole request including the body
/// * `proxy` - Optional HTTP proxy for all requests
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use potator_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(
///     "PotatorCrawler/1.0",
///     Duration::from_secs(10),
///     Duration::from_secs(30),
///     None,
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    user_agent: &str,
    connect_timeout: Duration,
    request_timeout: Duration,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.url())?);
    }

    builder.build()
}

/// Decodes a body according to its `Content-Encoding`
///
/// Only gzip is handled here; other encodings are returned untouched.
pub fn decode_body(headers: &HeaderMap, body: Vec<u8>) -> std::io::Result<Vec<u8>> {
    let gzipped = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .any(|enc| matches!(enc.trim().to_ascii_lowercase().as_str(), "gzip" | "x-gzip"))
        })
        .unwrap_or(false);

    if !gzipped {
        return Ok(body);
    }

    let mut decoded = Vec::with_capacity(body.len() * 2);
    GzDecoder::new(body.as_slice()).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Failure of a single attempt
enum AttemptError {
    Io(reqwest::Error),
    Decode(std::io::Error),
}

/// Page fetcher with retry
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client, normally from [`build_http_client`]
    /// * `max_retries` - Total attempts per URL (at least one is always made)
    /// * `policy` - Delay between attempts
    pub fn new(client: Client, max_retries: u32, policy: RetryPolicy) -> Self {
        Self {
            client,
            max_retries: max_retries.max(1),
            policy,
        }
    }

    /// Creates a fetcher from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let proxy = config.proxy();
        let client = build_http_client(
            &config.user_agent,
            config.connect_timeout(),
            config.request_timeout(),
            proxy.as_ref(),
        )
        .map_err(FetchError::Client)?;

        Ok(Self::new(
            client,
            config.fetch_retries,
            RetryPolicy::from_config(config),
        ))
    }

    /// Fetches a URL, retrying on I/O-level failures
    ///
    /// A received response is returned whatever its status; non-2xx statuses
    /// are not retried. Connection failures, timeouts and truncated bodies are
    /// retried up to `max_retries` attempts with the configured delay between
    /// them.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `cancel` - Interrupts retry sleeps on shutdown
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - A response was received
    /// * `Err(FetchError)` - Retries exhausted, body undecodable, or cancelled
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchResult, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.attempt(url).await {
                Ok(result) => return Ok(result),
                Err(AttemptError::Decode(source)) => {
                    return Err(FetchError::Decode {
                        url: url.to_string(),
                        source,
                    })
                }
                Err(AttemptError::Io(e)) => e,
            };

            if attempt >= self.max_retries {
                return Err(FetchError::Request {
                    url: url.to_string(),
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.policy.delay(attempt);
            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.max_retries,
                url,
                error,
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(FetchError::Cancelled { url: url.to_string() });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<FetchResult, AttemptError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .map_err(AttemptError::Io)?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let raw = response.bytes().await.map_err(AttemptError::Io)?;
        let body = decode_body(&headers, raw.to_vec()).map_err(AttemptError::Decode)?;

        Ok(FetchResult {
            status_code,
            body,
            final_url,
            content_type,
            content_length,
        })
    }
}
