use crate::storage::traits::{PageRecord, PageStorage, StorageResult};
use dashmap::DashMap;

/// In-memory page storage, keyed by normalized URL
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pages: DashMap<String, PageRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<PageRecord> {
        self.pages.get(url).map(|entry| entry.value().clone())
    }

    pub fn urls(&self) -> Vec<String> {
        self.pages.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageStorage for MemoryStorage {
    fn save(&self, page: &PageRecord) -> StorageResult<()> {
        self.pages.insert(page.url.clone(), page.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
