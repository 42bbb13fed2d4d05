//! Storage module for persisting crawled pages
//!
//! The crawl engine writes through the [`PageStorage`] trait. Three backends
//! are provided:
//! - [`FileStorage`]: `<hash>.html` + `<hash>.json` per page in a directory
//! - [`SqlitePageStorage`]: a single `pages.db` database
//! - [`MemoryStorage`]: in-process only, for tests and dry runs

mod files;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use files::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqlitePageStorage;
pub use traits::{content_address, PageMetadata, PageRecord, PageStorage, StorageError, StorageResult};

use crate::config::{CrawlerConfig, StorageBackend};
use std::sync::Arc;

/// File name of the page database inside `storageDir`
pub const PAGE_DB_FILE: &str = "pages.db";

/// Opens the storage backend selected by the configuration
///
/// The storage directory is created if missing. Failing to create or open it
/// is fatal to the run.
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn PageStorage>)` - Ready-to-use backend
/// * `Err(StorageError)` - The directory or database could not be opened
pub fn open_storage(config: &CrawlerConfig) -> StorageResult<Arc<dyn PageStorage>> {
    let storage: Arc<dyn PageStorage> = match config.storage_backend {
        StorageBackend::Files => Arc::new(FileStorage::new(&config.storage_dir)?),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(&config.storage_dir)?;
            Arc::new(SqlitePageStorage::open(
                &config.storage_dir.join(PAGE_DB_FILE),
            )?)
        }
    };

    tracing::info!(
        "Storing pages with the {} backend under {}",
        storage.name(),
        config.storage_dir.display()
    );

    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_files_backend() {
        let dir = TempDir::new().unwrap();
        let mut config = CrawlerConfig::default();
        config.storage_dir = dir.path().join("data");

        let storage = open_storage(&config).unwrap();
        assert_eq!(storage.name(), "files");
        assert!(config.storage_dir.is_dir());
    }

    #[test]
    fn test_open_sqlite_backend() {
        let dir = TempDir::new().unwrap();
        let mut config = CrawlerConfig::default();
        config.storage_dir = dir.path().join("data");
        config.storage_backend = StorageBackend::Sqlite;

        let storage = open_storage(&config).unwrap();
        assert_eq!(storage.name(), "sqlite");
        assert!(config.storage_dir.join(PAGE_DB_FILE).exists());
    }
}
