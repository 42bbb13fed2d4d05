//! SQLite page storage
//!
//! All pages live in one `pages` table keyed by content address. Saving the
//! same URL twice replaces the earlier row.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageMetadata, PageRecord, PageStorage, StorageResult};
use crate::storage::content_address;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite storage backend
pub struct SqlitePageStorage {
    conn: Mutex<Connection>,
}

impl SqlitePageStorage {
    /// Opens or creates the page database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqlitePageStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored pages
    pub fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Looks up the metadata stored for a normalized URL
    pub fn metadata(&self, url: &str) -> StorageResult<Option<PageMetadata>> {
        let row = self
            .conn()
            .query_row(
                "SELECT url, title, links FROM pages WHERE hash = ?1",
                params![content_address(url)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((url, title, links)) => Ok(Some(PageMetadata {
                url,
                title,
                links: serde_json::from_str(&links)?,
            })),
            None => Ok(None),
        }
    }
}

impl PageStorage for SqlitePageStorage {
    fn save(&self, page: &PageRecord) -> StorageResult<()> {
        let links = serde_json::to_string(&page.links)?;
        let now = Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO pages (hash, url, title, body, links, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(hash) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                links = excluded.links,
                fetched_at = excluded.fetched_at",
            params![
                page.content_address(),
                page.url,
                page.title,
                page.body,
                links,
                now
            ],
        )?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
