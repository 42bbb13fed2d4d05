//! Retry delay computation
//!
//! Two shapes are offered. [`Backoff`] is exponential with full jitter and is
//! suited to retries spread across many hosts. [`RetryPolicy::Linear`] grows
//! by a fixed step per attempt and gives a bounded, predictable wait when the
//! same URL is retried.

use crate::config::{BackoffStrategy, CrawlerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Largest shift applied to the base delay
const MAX_SHIFT: u32 = 20;

/// Computes a full-jitter exponential delay in milliseconds
///
/// The exponent is `base_ms * 2^min(attempt, 20)`, saturating; the envelope
/// is `max(base_ms, exponent)` capped at `max_ms`, and the result is drawn
/// uniformly from `[0, envelope]`.
///
/// # Arguments
///
/// * `attempt` - Zero-based retry attempt
/// * `base_ms` - Base delay
/// * `max_ms` - Upper cap on any returned delay
/// * `rng` - Source of randomness
///
/// # Returns
///
/// A delay in `[0, max_ms]`
pub fn compute_delay<R: Rng + ?Sized>(attempt: u32, base_ms: u64, max_ms: u64, rng: &mut R) -> u64 {
    let upper = envelope(attempt, base_ms, max_ms);
    if upper == 0 {
        return 0;
    }
    rng.gen_range(0..=upper)
}

/// Upper bound of [`compute_delay`] for a given attempt
pub fn envelope(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exponent = base_ms.saturating_mul(1u64 << attempt.min(MAX_SHIFT));
    base_ms.max(exponent).min(max_ms)
}

/// Jittered exponential backoff with its own random source
#[derive(Debug)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    rng: Mutex<StdRng>,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a backoff whose delays are reproducible
    pub fn with_seed(base_ms: u64, max_ms: u64, seed: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(compute_delay(attempt, self.base_ms, self.max_ms, &mut *rng))
    }
}

/// How long the fetcher sleeps between attempts on the same URL
#[derive(Debug)]
pub enum RetryPolicy {
    /// `base * attempt`
    Linear { base: Duration },
    Jittered(Backoff),
}

impl RetryPolicy {
    /// Builds the policy named by `fetchBackoffStrategy`
    pub fn from_config(config: &CrawlerConfig) -> Self {
        match config.fetch_backoff_strategy {
            BackoffStrategy::Linear => RetryPolicy::Linear {
                base: Duration::from_millis(config.fetch_backoff_ms),
            },
            BackoffStrategy::Jittered => RetryPolicy::Jittered(Backoff::new(
                config.fetch_backoff_ms,
                config.fetch_backoff_max_ms,
            )),
        }
    }

    /// Delay before retrying after the `attempt`-th failure (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Linear { base } => base.saturating_mul(attempt),
            RetryPolicy::Jittered(backoff) => backoff.delay(attempt.saturating_sub(1)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Linear {
            base: Duration::from_millis(500),
        }
    }
}
