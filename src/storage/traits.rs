//! Storage trait and error types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fetched and parsed page ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Normalized URL the page was requested under
    pub url: String,
    pub title: String,
    pub body: Vec<u8>,
    pub links: Vec<String>,
}

impl PageRecord {
    /// Stable content address of this page
    pub fn content_address(&self) -> String {
        content_address(&self.url)
    }

    pub fn metadata(&self) -> PageMetadata {
        PageMetadata {
            url: self.url.clone(),
            title: self.title.clone(),
            links: self.links.clone(),
        }
    }
}

/// The small JSON document stored beside each page body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub links: Vec<String>,
}

/// Hex-encoded SHA-256 of a normalized URL
pub fn content_address(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Trait for page storage backends
///
/// Implementations are shared by every worker and must be safe to call
/// concurrently. A failed save never aborts the crawl.
pub trait PageStorage: Send + Sync {
    /// Persists a page, replacing any earlier record for the same URL
    fn save(&self, page: &PageRecord) -> StorageResult<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_address_is_stable_hex() {
        let a = content_address("https://example.com/");
        assert_eq!(a, content_address("https://example.com/"));
        assert_ne!(a, content_address("https://example.com/other"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_metadata_json_escapes() {
        let record = PageRecord {
            url: "https://example.com/".to_string(),
            title: r#"Say "hi" \ bye"#.to_string(),
            body: Vec::new(),
            links: vec!["https://example.com/a".to_string()],
        };
        let json = serde_json::to_string(&record.metadata()).unwrap();
        assert!(json.contains(r#""title":"Say \"hi\" \\ bye""#));

        let parsed: PageMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record.metadata());
    }
}
