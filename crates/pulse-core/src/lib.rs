//! Pulse Core - Domain types and errors
//!
//! This crate provides the foundational types shared by the Pulse
//! dashboard backend: cache keys, opaque payloads, block records used
//! for throughput sampling, and the common error type.

pub mod error;
pub mod types;

pub use error::{PulseError, Result};
pub use types::{BlockRecord, CacheKey, Payload, ShardId, Timeframe};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
