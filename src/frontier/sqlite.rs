//! SQLite-backed durable frontier store

use crate::frontier::{CrawlTask, FrontierError, FrontierStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS frontier (
    seq INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_frontier_order ON frontier(depth, seq);
"#;

/// Frontier store persisted in a SQLite table
///
/// Pending tasks survive process restarts; the connection is released by
/// `close`, after which every operation fails with [`FrontierError::Closed`].
#[derive(Debug)]
pub struct SqliteFrontierStore {
    conn: Option<Connection>,
}

impl SqliteFrontierStore {
    /// Opens or creates the frontier database at `path`
    pub fn open(path: &Path) -> Result<Self, FrontierError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, FrontierError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, FrontierError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> Result<&Connection, FrontierError> {
        self.conn.as_ref().ok_or(FrontierError::Closed)
    }
}

impl FrontierStore for SqliteFrontierStore {
    fn push(&mut self, task: &CrawlTask) -> Result<(), FrontierError> {
        self.conn()?.execute(
            "INSERT INTO frontier (seq, url, depth) VALUES (?1, ?2, ?3)",
            params![task.sequence as i64, task.url, task.depth],
        )?;
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<CrawlTask>, FrontierError> {
        let conn = self.conn.as_mut().ok_or(FrontierError::Closed)?;
        let tx = conn.transaction()?;

        let task = tx
            .query_row(
                "SELECT seq, url, depth FROM frontier ORDER BY depth ASC, seq ASC LIMIT 1",
                [],
                |row| {
                    Ok(CrawlTask {
                        sequence: row.get::<_, i64>(0)? as u64,
                        url: row.get(1)?,
                        depth: row.get(2)?,
                    })
                },
            )
            .optional()?;

        if let Some(task) = &task {
            tx.execute(
                "DELETE FROM frontier WHERE seq = ?1",
                params![task.sequence as i64],
            )?;
        }
        tx.commit()?;

        Ok(task)
    }

    fn len(&self) -> Result<usize, FrontierError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn next_sequence(&self) -> Result<u64, FrontierError> {
        let max: Option<i64> = self
            .conn()?
            .query_row("SELECT MAX(seq) FROM frontier", [], |row| row.get(0))?;
        Ok(max.map(|m| m as u64 + 1).unwrap_or(0))
    }

    fn close(&mut self) -> Result<(), FrontierError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| FrontierError::Sqlite(e))?;
        }
        Ok(())
    }
}
