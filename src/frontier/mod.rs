//! Crawl frontier
//!
//! The frontier holds pending [`CrawlTask`]s and hands them to workers in
//! ascending `(depth, sequence)` order: breadth-first across depths, FIFO
//! within a depth. Any number of workers may `add` concurrently; each task is
//! delivered to exactly one `poll` caller.
//!
//! The backing store is pluggable: [`MemoryFrontierStore`] for ordinary runs
//! and [`SqliteFrontierStore`] when pending work should survive a restart.

mod memory;
mod sqlite;
mod visited;

pub use memory::MemoryFrontierStore;
pub use sqlite::SqliteFrontierStore;
pub use visited::VisitedSet;

use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Errors raised by frontier stores
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Frontier is closed")]
    Closed,
}

/// One unit of pending work
///
/// Created when a seed is submitted or a link discovered; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
    /// Monotonic creation counter, used only as a tie-breaker within a depth
    pub sequence: u64,
}

impl Ord for CrawlTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for CrawlTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Backing storage for pending tasks
///
/// Stores are only ever accessed under the frontier's lock, so implementations
/// need not synchronize internally.
pub trait FrontierStore: Send {
    /// Stores a task
    fn push(&mut self, task: &CrawlTask) -> Result<(), FrontierError>;

    /// Removes and returns the lowest `(depth, sequence)` task
    fn pop(&mut self) -> Result<Option<CrawlTask>, FrontierError>;

    /// Number of pending tasks
    fn len(&self) -> Result<usize, FrontierError>;

    /// Sequence number the next new task should receive
    ///
    /// Durable stores return one past the highest persisted sequence.
    fn next_sequence(&self) -> Result<u64, FrontierError> {
        Ok(0)
    }

    /// Releases backing resources. Must tolerate being called twice.
    fn close(&mut self) -> Result<(), FrontierError>;
}

struct FrontierInner {
    store: Box<dyn FrontierStore>,
    next_sequence: u64,
}

/// Thread-safe prioritized queue of pending crawl tasks
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    closed: AtomicBool,
}

impl Frontier {
    /// Creates a frontier over the given store
    pub fn with_store(store: Box<dyn FrontierStore>) -> Result<Self, FrontierError> {
        let next_sequence = store.next_sequence()?;
        Ok(Self {
            inner: Mutex::new(FrontierInner {
                store,
                next_sequence,
            }),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a frontier held entirely in memory
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(FrontierInner {
                store: Box::new(MemoryFrontierStore::new()),
                next_sequence: 0,
            }),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Opens (or creates) a durable frontier in a SQLite file
    ///
    /// Tasks left pending by a previous run are resumed.
    pub fn open_sqlite(path: &Path) -> Result<Self, FrontierError> {
        let store = SqliteFrontierStore::open(path)?;
        Self::with_store(Box::new(store))
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task with the next sequence number
    pub fn add(&self, url: &str, depth: u32) -> Result<CrawlTask, FrontierError> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(FrontierError::Closed);
        }

        let task = {
            let mut inner = self.lock();
            let task = CrawlTask {
                url: url.to_string(),
                depth,
                sequence: inner.next_sequence,
            };
            inner.store.push(&task)?;
            inner.next_sequence += 1;
            task
        };

        self.notify.notify_one();
        Ok(task)
    }

    /// Removes the next task without waiting
    pub fn try_poll(&self) -> Option<CrawlTask> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return None;
        }

        match self.lock().store.pop() {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!("Failed to pop from frontier: {}", e);
                None
            }
        }
    }

    /// Waits up to `timeout` for the next task
    ///
    /// Returns `None` if nothing arrives in time or the frontier is closed.
    pub async fn poll(&self, timeout: Duration) -> Option<CrawlTask> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(task) = self.try_poll() {
                return Some(task);
            }
            if self.closed.load(AtomicOrdering::Acquire) {
                return None;
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_poll();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending tasks; zero once closed
    pub fn len(&self) -> usize {
        if self.closed.load(AtomicOrdering::Acquire) {
            return 0;
        }
        match self.lock().store.len() {
            Ok(len) => len,
            Err(e) => {
                tracing::warn!("Failed to size frontier: {}", e);
                0
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    /// Releases the backing store and wakes any waiting pollers
    ///
    /// Idempotent. Afterwards `add` fails with [`FrontierError::Closed`] and
    /// `poll` returns `None` immediately.
    pub fn close(&self) {
        if self.closed.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        if let Err(e) = self.lock().store.close() {
            tracing::warn!("Failed to close frontier store: {}", e);
        }
        self.notify.notify_waiters();
    }
}

impl Drop for Frontier {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Frontier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontier")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_breadth_first_then_fifo() {
        let frontier = Frontier::in_memory();
        frontier.add("A", 1).unwrap();
        frontier.add("B", 0).unwrap();
        frontier.add("C", 0).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| frontier.try_poll())
            .map(|t| t.url)
            .collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let frontier = Frontier::in_memory();
        let first = frontier.add("https://example.com/1", 0).unwrap();
        let second = frontier.add("https://example.com/2", 0).unwrap();
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn test_is_empty() {
        let frontier = Frontier::in_memory();
        assert!(frontier.is_empty());
        frontier.add("https://example.com/", 0).unwrap();
        assert!(!frontier.is_empty());
        assert_eq!(frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_poll_times_out_when_empty() {
        let frontier = Frontier::in_memory();
        let start = Instant::now();
        assert!(frontier.poll(Duration::from_millis(50)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_poll_wakes_on_add() {
        let frontier = Arc::new(Frontier::in_memory());

        let poller = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.poll(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.add("https://example.com/late", 0).unwrap();

        let task = poller.await.unwrap().unwrap();
        assert_eq!(task.url, "https://example.com/late");
    }

    #[tokio::test]
    async fn test_concurrent_add_and_poll_deliver_once() {
        let frontier = Arc::new(Frontier::in_memory());

        let mut producers = Vec::new();
        for p in 0..4 {
            let frontier = frontier.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..50 {
                    frontier
                        .add(&format!("https://example.com/{}/{}", p, i), i % 3)
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let frontier = frontier.clone();
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(task) = frontier.poll(Duration::from_millis(200)).await {
                    seen.push(task.url);
                }
                seen
            }));
        }

        for producer in producers {
            producer.await.unwrap();
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }

        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 200);
        assert_eq!(unique.len(), 200);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fails_fast() {
        let frontier = Frontier::in_memory();
        frontier.add("https://example.com/", 0).unwrap();

        frontier.close();
        frontier.close();

        assert!(frontier.is_closed());
        assert!(matches!(
            frontier.add("https://example.com/x", 0),
            Err(FrontierError::Closed)
        ));

        let start = Instant::now();
        assert!(frontier.poll(Duration::from_secs(5)).await.is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(frontier.is_empty());
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_poller() {
        let frontier = Arc::new(Frontier::in_memory());

        let poller = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.poll(Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let start = Instant::now();
        frontier.close();

        assert!(poller.await.unwrap().is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
