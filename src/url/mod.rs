//! URL handling module
//!
//! This module provides URL normalization, host extraction and the host
//! allow-list check used before any task is fetched.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{host_of, is_host_allowed, origin_of};
pub use normalize::{normalize, strip_fragment};
