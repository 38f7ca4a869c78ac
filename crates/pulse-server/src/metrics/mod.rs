//! Metrics for the Pulse server.
//!
//! Cache and sampler metrics are emitted by their own crates; this module
//! adds HTTP metrics and installs the Prometheus recorder.

pub mod http;
pub mod setup;

pub use setup::{init_metrics, test_handle};
