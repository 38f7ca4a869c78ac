//! Rate computation over a block window.

use std::collections::HashMap;
use std::time::Duration;

use pulse_core::{BlockRecord, ShardId};
use serde::Serialize;

use crate::error::SampleError;

/// One throughput observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSample {
    /// Transactions per second, rounded to two decimals.
    pub rate: f64,
    /// Summed transaction count of the latest block per shard.
    pub tx_count: u64,
    /// Number of shards that contributed a block.
    pub partitions: usize,
    /// Window the count is divided by.
    #[serde(with = "window_secs")]
    pub window: Duration,
}

/// Computes the rate for one window of block records.
///
/// For each shard only the record with the highest round counts. The
/// summed transaction count is divided by `window` and rounded to two
/// decimals. When `tracked` is set, records from other shards are ignored.
///
/// # Errors
///
/// - [`SampleError::InvalidWindow`] if `window` is zero
/// - [`SampleError::EmptyWindow`] if no record remains after filtering
pub fn compute_rate(
    records: &[BlockRecord],
    window: Duration,
    tracked: Option<&[ShardId]>,
) -> Result<RateSample, SampleError> {
    if window.is_zero() {
        return Err(SampleError::InvalidWindow);
    }

    let mut latest: HashMap<ShardId, &BlockRecord> = HashMap::new();
    for record in records {
        if let Some(tracked) = tracked
            && !tracked.contains(&record.shard)
        {
            continue;
        }

        latest
            .entry(record.shard)
            .and_modify(|current| {
                if record.round > current.round {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    if latest.is_empty() {
        return Err(SampleError::EmptyWindow);
    }

    let tx_count: u64 = latest.values().map(|r| r.tx_count).sum();
    let rate = round2(tx_count as f64 / window.as_secs_f64());

    Ok(RateSample {
        rate,
        tx_count,
        partitions: latest.len(),
        window,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

mod window_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(window.as_secs_f64())
    }
}
