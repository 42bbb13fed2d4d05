//! Crawl metrics
//!
//! Counters are updated by every worker without locking. Snapshots are
//! reporting only and never feed back into crawl decisions.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Hosts listed in a snapshot's failure breakdown
const TOP_FAILING_HOSTS: usize = 5;

/// Live crawl counters
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    pages_fetched: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    in_flight: AtomicUsize,
    bytes: AtomicU64,
    fetch_count: AtomicU64,
    total_latency_ms: AtomicU64,
    host_failures: DashMap<String, u64>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            pages_fetched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
            fetch_count: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            host_failures: DashMap::new(),
        }
    }

    /// Records one completed HTTP exchange
    pub fn record_fetch(&self, latency_ms: u64, bytes: u64) {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a page that was crawled to completion
    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed task against its host
    pub fn record_failure(&self, host: &str) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        *self.host_failures.entry(host.to_string()).or_insert(0) += 1;
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub fn task_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Tasks currently between poll and outcome
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn host_failures(&self, host: &str) -> u64 {
        self.host_failures.get(host).map(|v| *v).unwrap_or(0)
    }

    /// Takes a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let fetch_count = self.fetch_count.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let mut top_failing_hosts: Vec<(String, u64)> = self
            .host_failures
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        top_failing_hosts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_failing_hosts.truncate(TOP_FAILING_HOSTS);

        MetricsSnapshot {
            elapsed: self.started.elapsed(),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            bytes: self.bytes.load(Ordering::Relaxed),
            fetch_count,
            avg_latency_ms: if fetch_count == 0 {
                0.0
            } else {
                total_latency_ms as f64 / fetch_count as f64
            },
            top_failing_hosts,
        }
    }
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub elapsed: Duration,
    pub pages_fetched: u64,
    pub failed: u64,
    pub skipped: u64,
    pub in_flight: usize,
    pub bytes: u64,
    pub fetch_count: u64,
    pub avg_latency_ms: f64,
    /// Hosts with the most failures, highest first
    pub top_failing_hosts: Vec<(String, u64)>,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}s] fetched={} failed={} skipped={} in-flight={} bytes={} avg-latency={:.1}ms",
            self.elapsed.as_secs_f64(),
            self.pages_fetched,
            self.failed,
            self.skipped,
            self.in_flight,
            self.bytes,
            self.avg_latency_ms
        )?;

        if !self.top_failing_hosts.is_empty() {
            let hosts: Vec<String> = self
                .top_failing_hosts
                .iter()
                .map(|(host, count)| format!("{}={}", host, count))
                .collect();
            write!(f, " failing-hosts=[{}]", hosts.join(", "))?;
        }

        Ok(())
    }
}

/// Logs a snapshot every `interval` until `cancel` fires
pub fn spawn_reporter(
    metrics: Arc<Metrics>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::info!("Metrics {}", metrics.snapshot());
                }
            }
        }
    })
}
