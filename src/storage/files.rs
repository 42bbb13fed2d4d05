//! Flat-file page storage
//!
//! Each page becomes two files named by its content address:
//! `<hash>.html` with the raw body and `<hash>.json` with its metadata.

use crate::storage::traits::{PageRecord, PageStorage, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens a storage directory, creating it if needed
    ///
    /// # Returns
    ///
    /// * `Ok(FileStorage)` - The directory exists and is usable
    /// * `Err(StorageError)` - The directory could not be created
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn body_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.html", hash))
    }

    pub fn metadata_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }
}

impl PageStorage for FileStorage {
    fn save(&self, page: &PageRecord) -> StorageResult<()> {
        let hash = page.content_address();
        let metadata = serde_json::to_vec(&page.metadata())?;

        fs::write(self.body_path(&hash), &page.body)?;
        fs::write(self.metadata_path(&hash), metadata)?;

        tracing::trace!("Stored {} as {}", page.url, hash);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "files"
    }
}
