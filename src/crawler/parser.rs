//! HTML parser for extracting links and the page title
//!
//! The crawl engine only depends on the [`PageParser`] trait, so alternative
//! extractors can be swapped in without touching the worker loop.

use crate::url::strip_fragment;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Text of the first `<title>`, trimmed; empty when absent
    pub title: String,

    /// Distinct absolute links in document order, fragments removed
    pub links: Vec<String>,
}

/// Turns a fetched body into a title and outgoing links
///
/// Implementations must be pure: no I/O and no shared state.
pub trait PageParser: Send + Sync {
    fn parse(&self, body: &str, base_url: &Url) -> ParsedPage;
}

/// [`PageParser`] backed by `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that does not resolve to http or https
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl PageParser for HtmlParser {
    fn parse(&self, body: &str, base_url: &Url) -> ParsedPage {
        parse_html(body, base_url)
    }
}

/// Parses HTML content and extracts links and the title
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use potator_crawler::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#top">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document).unwrap_or_default(),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |link: String| {
        if seen.insert(link.clone()) {
            links.push(link);
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                push(absolute_url);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL without its fragment
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    Some(strip_fragment(absolute_url.as_str()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn parse(html: &str) -> ParsedPage {
        HtmlParser.parse(html, &base_url())
    }

    #[test]
    fn test_extract_title() {
        let parsed = parse(r#"<html><head><title>  Test Page  </title></head><body></body></html>"#);
        assert_eq!(parsed.title, "Test Page");
    }

    #[test]
    fn test_no_title() {
        let parsed = parse(r#"<html><head></head><body></body></html>"#);
        assert_eq!(parsed.title, "");
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let parsed = parse(
            r#"<html><body>
                <a href="https://other.com/page">1</a>
                <a href="/other">2</a>
                <a href="sibling">3</a>
            </body></html>"#,
        );
        assert_eq!(
            parsed.links,
            vec![
                "https://other.com/page",
                "https://example.com/other",
                "https://example.com/sibling",
            ]
        );
    }

    #[test]
    fn test_fragments_are_stripped() {
        let parsed = parse(r#"<html><body><a href="/doc#section-2">Doc</a></body></html>"#);
        assert_eq!(parsed.links, vec!["https://example.com/doc"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let parsed = parse(
            r#"<html><body>
                <a href="/a">1</a>
                <a href="/a#x">2</a>
                <a href="https://example.com/a">3</a>
            </body></html>"#,
        );
        assert_eq!(parsed.links, vec!["https://example.com/a"]);
    }

    #[test]
    fn test_skips_non_navigable_links() {
        let parsed = parse(
            r##"<html><body>
                <a href="javascript:void(0)">js</a>
                <a href="JavaScript:alert(1)">js</a>
                <a href="mailto:test@example.com">mail</a>
                <a href="tel:+1234567890">tel</a>
                <a href="data:text/html,<h1>x</h1>">data</a>
                <a href="ftp://example.com/file">ftp</a>
                <a href="#section">jump</a>
                <a href="/file.pdf" download>dl</a>
                <a href="">empty</a>
            </body></html>"##,
        );
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_follow_nofollow_links() {
        let parsed = parse(r#"<html><body><a href="/page" rel="nofollow">Link</a></body></html>"#);
        assert_eq!(parsed.links, vec!["https://example.com/page"]);
    }

    #[test]
    fn test_extract_canonical_link() {
        let parsed = parse(
            r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head><body></body></html>"#,
        );
        assert!(parsed
            .links
            .contains(&"https://example.com/canonical".to_string()));
    }
}
