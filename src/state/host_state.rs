use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-host politeness gate
///
/// Each host has its own async lock around the timestamp of its last permitted
/// fetch start. Acquirers for the same host queue on that lock, so consecutive
/// permits are at least `interval` apart; different hosts never contend.
#[derive(Debug)]
pub struct HostRateLimiter {
    interval: Duration,
    hosts: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl HostRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            hosts: DashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a fetch to `host` may start, then records the permit
    ///
    /// # Returns
    ///
    /// * `true` - The caller may fetch now
    /// * `false` - `cancel` fired while waiting; nothing was recorded
    pub async fn acquire(&self, host: &str, cancel: &CancellationToken) -> bool {
        let slot = self
            .hosts
            .entry(host.to_lowercase())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut last_permit = tokio::select! {
            guard = slot.lock() => guard,
            _ = cancel.cancelled() => return false,
        };

        if let Some(last) = *last_permit {
            let ready_at = last + self.interval;
            if ready_at > Instant::now() {
                tracing::trace!("Waiting for politeness interval on {}", host);
                tokio::select! {
                    _ = tokio::time::sleep_until(ready_at) => {}
                    _ = cancel.cancelled() => return false,
                }
            }
        }

        if cancel.is_cancelled() {
            return false;
        }

        *last_permit = Some(Instant::now());
        true
    }

    /// Number of hosts that have been acquired at least once
    pub fn tracked_hosts(&self) -> usize {
        self.hosts.len()
    }
}
