//! Published sampler state.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::rate::RateSample;

/// Shared state written by the sampler and read by any number of readers.
///
/// The current rate is an `f64` stored as bits in an `AtomicU64`, so
/// [`current_value`](RateState::current_value) never waits on the sampler.
#[derive(Debug)]
pub struct RateState {
    /// Current rate as `f64` bits.
    current: AtomicU64,
    /// The last successful sample.
    last_sample: RwLock<Option<RateSample>>,
    /// When the last successful sample was published.
    last_sample_at: RwLock<Option<DateTime<Utc>>>,
    /// The last error message, if any.
    last_error: RwLock<Option<String>>,
    /// Number of consecutive failures.
    failure_count: RwLock<u32>,
    /// Total successful samples.
    samples: AtomicU64,
}

/// Point-in-time copy of [`RateState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSnapshot {
    pub rate: f64,
    pub last_sample: Option<RateSample>,
    pub last_sample_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub failure_count: u32,
    pub samples: u64,
}

impl RateState {
    /// Creates a new state with a rate of zero.
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0f64.to_bits()),
            last_sample: RwLock::new(None),
            last_sample_at: RwLock::new(None),
            last_error: RwLock::new(None),
            failure_count: RwLock::new(0),
            samples: AtomicU64::new(0),
        }
    }

    /// Returns the latest published rate.
    pub fn current_value(&self) -> f64 {
        f64::from_bits(self.current.load(Ordering::Acquire))
    }

    /// Publishes a successful sample.
    pub(crate) fn publish(&self, sample: RateSample) {
        let mut last_sample = self.last_sample.write();
        let mut last_sample_at = self.last_sample_at.write();
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        self.current.store(sample.rate.to_bits(), Ordering::Release);
        self.samples.fetch_add(1, Ordering::Relaxed);

        *last_sample = Some(sample);
        *last_sample_at = Some(Utc::now());
        *last_error = None;
        *failure_count = 0;
    }

    /// Records a failed sample. The current rate is kept.
    pub(crate) fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();

        *last_error = Some(error.into());
        *failure_count += 1;
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    /// Returns the total number of successful samples.
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Returns true once at least one sample has been published.
    pub fn is_initialized(&self) -> bool {
        self.last_sample_at.read().is_some()
    }

    /// Returns a copy of the whole state.
    pub fn snapshot(&self) -> RateSnapshot {
        let last_sample = self.last_sample.read();
        let last_sample_at = self.last_sample_at.read();
        let last_error = self.last_error.read();
        let failure_count = self.failure_count.read();

        RateSnapshot {
            rate: self.current_value(),
            last_sample: last_sample.clone(),
            last_sample_at: *last_sample_at,
            last_error: last_error.clone(),
            failure_count: *failure_count,
            samples: self.samples(),
        }
    }
}

impl Default for RateState {
    fn default() -> Self {
        Self::new()
    }
}
