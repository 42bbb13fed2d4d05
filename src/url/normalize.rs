use url::Url;

/// Scheme assumed for URLs written without one (`example.com/a`)
const DEFAULT_SCHEME: &str = "https";

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Default a missing scheme to `https` (`//host/..`, `host/..` and
///    `host:port/..` forms)
/// 3. Lowercase the host
/// 4. Empty path becomes `/`
/// 5. Keep the query string as given
/// 6. Remove the fragment
///
/// Normalization is best-effort: input that cannot be parsed as a URL, or
/// that carries a scheme other than `http`/`https`, is returned unchanged.
/// The function is idempotent.
///
/// # Examples
///
/// ```
/// use potator_crawler::url::normalize;
///
/// assert_eq!(normalize("EXAMPLE.com/a#top"), "https://example.com/a");
/// assert_eq!(normalize("not a url"), "not a url");
/// assert_eq!(normalize("mailto:someone@example.com"), "mailto:someone@example.com");
/// ```
pub fn normalize(raw: &str) -> String {
    let candidate = with_default_scheme(raw.trim());

    let mut url = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return raw.to_string();
    }

    // Special schemes already lowercase their host; others need it done here
    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host && url.set_host(Some(&lowered)).is_err() {
            return raw.to_string();
        }
    }

    if url.path().is_empty() && !url.cannot_be_a_base() {
        url.set_path("/");
    }

    url.set_fragment(None);

    url.to_string()
}

/// Removes a `#...` suffix from a link
pub fn strip_fragment(link: &str) -> &str {
    match link.find('#') {
        Some(idx) => &link[..idx],
        None => link,
    }
}

fn with_default_scheme(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("//") {
        format!("{}://{}", DEFAULT_SCHEME, rest)
    } else if has_scheme(raw) {
        raw.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, raw)
    }
}

/// Whether `raw` opens with `scheme:`
///
/// Only the text before the first `/`, `?` or `#` is considered, so URLs
/// embedded in a query do not count. `host:port` is not a scheme.
fn has_scheme(raw: &str) -> bool {
    let head = raw.split(['/', '?', '#']).next().unwrap_or_default();
    let Some((scheme, rest)) = head.split_once(':') else {
        return false;
    };

    let valid_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let is_port = !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit());

    valid_scheme && !is_port
}
