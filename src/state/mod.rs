//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskOutcome`: the tagged result of processing one crawl task
//! - `HostRateLimiter`: per-host politeness gate shared by all workers
//! - `PageBudget`: reservation-based cap on committed pages

mod budget;
mod host_state;
mod outcome;

// Re-export main types
pub use budget::PageBudget;
pub use host_state::HostRateLimiter;
pub use outcome::{FailureReason, SkipReason, TaskOutcome};
