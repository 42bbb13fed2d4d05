use crate::url::normalize;
use std::collections::HashSet;
use url::Url;

/// Extracts the lower-cased host from a URL string
///
/// The URL is normalized first, so a missing scheme is tolerated.
///
/// # Examples
///
/// ```
/// use potator_crawler::url::host_of;
///
/// assert_eq!(host_of("https://EXAMPLE.COM/path"), Some("example.com".to_string()));
/// assert_eq!(host_of("sub.example.com/x"), Some("sub.example.com".to_string()));
/// assert_eq!(host_of("not a url"), None);
/// ```
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(&normalize(url))
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// Returns the `scheme://host[:port]` origin of a URL
///
/// Used as the robots.txt cache key. `None` when the URL cannot be parsed or
/// has no host.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(&normalize(url)).ok()?;
    parsed.host_str()?;
    Some(parsed.origin().ascii_serialization())
}

/// Checks a host against the configured allow-list
///
/// An empty allow-list places no restriction. Matching is case-insensitive.
pub fn is_host_allowed(host: &str, allowed: &HashSet<String>) -> bool {
    allowed.is_empty() || allowed.contains(&host.to_lowercase())
}
