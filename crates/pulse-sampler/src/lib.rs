//! # Pulse Sampler
//!
//! Background task that keeps a live transactions-per-second estimate.
//!
//! A [`RateSampler`] polls a [`BlockSource`] on a fixed period, keeps the
//! latest block of every shard in the window, and publishes
//! `sum(tx_count) / period` into a [`RateState`] that readers can query at
//! any time without waiting.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pulse_sampler::{RateSampler, SamplerConfig};
//!
//! let sampler = RateSampler::new(Arc::new(source), SamplerConfig::default());
//! sampler.start();
//!
//! let tps = sampler.current_value();
//!
//! sampler.stop().await;
//! ```

pub mod error;
pub mod rate;
pub mod scheduler;
pub mod source;
pub mod state;

// Re-exports
pub use error::SampleError;
pub use rate::{RateSample, compute_rate};
pub use scheduler::{RateSampler, SamplerConfig, register_sampler_metrics};
pub use source::BlockSource;
pub use state::{RateSnapshot, RateState};
