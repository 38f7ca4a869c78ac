//! Background sampling loop.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use pulse_core::ShardId;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use crate::error::SampleError;
use crate::rate::{RateSample, compute_rate};
use crate::source::BlockSource;
use crate::state::{RateSnapshot, RateState};

/// Registers the sampler metric descriptions.
pub fn register_sampler_metrics() {
    metrics::describe_gauge!("pulse_sampler_rate", "Latest published transactions per second");
    metrics::describe_counter!(
        "pulse_sampler_samples_total",
        "Sampling attempts by outcome"
    );
}

/// Configuration for the rate sampler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between samples; also the window the count is divided by.
    pub interval_seconds: u64,
    /// Upper bound for a single block source call, in seconds.
    pub request_timeout_seconds: u64,
    /// Shards that contribute to the rate. `None` counts every shard.
    pub tracked_shards: Option<Vec<ShardId>>,
}

impl SamplerConfig {
    /// Returns the sampling period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Returns the per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 6,
            request_timeout_seconds: 5,
            tracked_shards: None,
        }
    }
}

/// Handle of a running sampling loop.
struct SamplerHandle {
    /// Sender to signal shutdown.
    shutdown_tx: watch::Sender<bool>,
    /// The spawned loop.
    task: JoinHandle<()>,
}

/// Periodically recomputes the transaction rate and publishes it into a
/// shared [`RateState`].
///
/// Lifecycle is `Stopped -> Running -> Stopped`; both transitions are
/// idempotent.
pub struct RateSampler {
    inner: Arc<SamplerInner>,
    running: Mutex<Option<SamplerHandle>>,
}

struct SamplerInner {
    source: Arc<dyn BlockSource>,
    state: Arc<RateState>,
    config: SamplerConfig,
}

impl RateSampler {
    /// Creates a stopped sampler.
    pub fn new(source: Arc<dyn BlockSource>, config: SamplerConfig) -> Self {
        Self {
            inner: Arc::new(SamplerInner {
                source,
                state: Arc::new(RateState::new()),
                config,
            }),
            running: Mutex::new(None),
        }
    }

    /// Creates a sampler with default configuration.
    pub fn with_defaults(source: Arc<dyn BlockSource>) -> Self {
        Self::new(source, SamplerConfig::default())
    }

    /// Starts the background loop.
    ///
    /// Returns `false` if the loop was already running or the configured
    /// interval is zero. Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        if self.inner.config.interval().is_zero() {
            warn!("Rate sampler interval is zero, not starting");
            return false;
        }

        let mut running = self.running.lock();
        if running.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&self.inner).run(shutdown_rx));

        *running = Some(SamplerHandle { shutdown_tx, task });
        true
    }

    /// Stops the background loop and waits for it to finish.
    ///
    /// An in-flight sample completes first. Returns `false` if the loop was
    /// not running.
    pub async fn stop(&self) -> bool {
        let handle = self.running.lock().take();
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.shutdown_tx.send(true);
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Rate sampler task ended abnormally");
        }

        info!("Rate sampler stopped");
        true
    }

    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Takes one sample now, outside the periodic cadence.
    pub async fn sample_once(&self) -> Result<RateSample, SampleError> {
        self.inner.sample().await
    }

    /// Returns the latest published rate. Never waits on a running sample.
    pub fn current_value(&self) -> f64 {
        self.inner.state.current_value()
    }

    /// Returns a copy of the full sampler state.
    pub fn snapshot(&self) -> RateSnapshot {
        self.inner.state.snapshot()
    }

    /// Returns the shared state.
    pub fn state(&self) -> &Arc<RateState> {
        &self.inner.state
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.inner.config
    }
}

impl Drop for RateSampler {
    fn drop(&mut self) {
        if let Some(handle) = self.running.get_mut().take() {
            let _ = handle.shutdown_tx.send(true);
        }
    }
}

impl std::fmt::Debug for RateSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateSampler")
            .field("source", &self.inner.source.name())
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl SamplerInner {
    /// Runs the sampling loop until shutdown is signalled.
    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let period = self.config.interval();
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = self.source.name(),
            interval_secs = period.as_secs(),
            "Starting rate sampler"
        );

        loop {
            tokio::select! {
                biased;
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        debug!("Rate sampler shutting down");
                        break;
                    }
                }
                _ = timer.tick() => {
                    // Los errores ya quedan registrados en el estado
                    let _ = self.sample().await;
                }
            }
        }
    }

    /// Performs a single sample and publishes the outcome.
    async fn sample(&self) -> Result<RateSample, SampleError> {
        let timeout_after = self.config.request_timeout();

        let result = match timeout(timeout_after, self.source.recent_blocks()).await {
            Ok(Ok(records)) => compute_rate(
                &records,
                self.config.interval(),
                self.config.tracked_shards.as_deref(),
            ),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SampleError::Timeout {
                seconds: timeout_after.as_secs(),
            }),
        };

        match &result {
            Ok(sample) => {
                self.state.publish(sample.clone());
                gauge!("pulse_sampler_rate").set(sample.rate);
                counter!("pulse_sampler_samples_total", "outcome" => "success").increment(1);
                debug!(
                    rate = sample.rate,
                    tx_count = sample.tx_count,
                    partitions = sample.partitions,
                    "Rate sample published"
                );
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
                counter!("pulse_sampler_samples_total", "outcome" => e.outcome()).increment(1);
                warn!(
                    source = self.source.name(),
                    error = %e,
                    failures = self.state.failure_count(),
                    "Rate sample failed, keeping previous value"
                );
            },
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pulse_core::BlockRecord;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Source que devuelve respuestas en orden y luego repite la ultima.
    struct ScriptedSource {
        responses: parking_lot::Mutex<VecDeque<Result<Vec<BlockRecord>, String>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<BlockRecord>, String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: parking_lot::Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BlockSource for ScriptedSource {
        async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock();
            let next = if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            };
            match next {
                Some(Ok(records)) => Ok(records),
                Some(Err(reason)) => Err(SampleError::unavailable(reason)),
                None => Err(SampleError::EmptyWindow),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Source que nunca responde.
    struct HangingSource;

    #[async_trait]
    impl BlockSource for HangingSource {
        async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    /// Source que tarda en responder.
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl BlockSource for SlowSource {
        async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
            tokio::time::sleep(self.delay).await;
            Ok(window(60))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn window(tx: u64) -> Vec<BlockRecord> {
        vec![BlockRecord::new(ShardId(0), 1, tx)]
    }

    #[test]
    fn test_config_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(6));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.tracked_shards.is_none());
    }

    #[tokio::test]
    async fn test_sample_once_publishes() {
        let source = ScriptedSource::new(vec![Ok(window(60))]);
        let sampler = RateSampler::with_defaults(source);

        let sample = sampler.sample_once().await.unwrap();

        assert_eq!(sample.rate, 10.0);
        assert_eq!(sampler.current_value(), 10.0);
        assert!(!sampler.is_running());
    }

    #[tokio::test]
    async fn test_failure_retains_previous_value() {
        let source = ScriptedSource::new(vec![Ok(window(12)), Err("api down".into())]);
        let sampler = RateSampler::with_defaults(source);

        sampler.sample_once().await.unwrap();
        assert!(sampler.sample_once().await.is_err());

        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.rate, 2.0);
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.last_error.unwrap().contains("api down"));
    }

    #[tokio::test]
    async fn test_empty_window_retains_previous_value() {
        let source = ScriptedSource::new(vec![Ok(window(30)), Ok(vec![])]);
        let sampler = RateSampler::with_defaults(source);

        sampler.sample_once().await.unwrap();
        let err = sampler.sample_once().await.unwrap_err();

        assert!(matches!(err, SampleError::EmptyWindow));
        assert_eq!(sampler.current_value(), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_source_times_out() {
        let sampler = RateSampler::with_defaults(Arc::new(HangingSource));

        let err = sampler.sample_once().await.unwrap_err();

        assert!(matches!(err, SampleError::Timeout { seconds: 5 }));
        assert_eq!(sampler.state().failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let source = ScriptedSource::new(vec![Ok(window(6))]);
        let sampler = RateSampler::with_defaults(source.clone());

        assert!(sampler.start());
        assert!(!sampler.start());
        assert!(sampler.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(sampler.current_value(), 1.0);

        assert!(sampler.stop().await);
        assert!(!sampler.stop().await);
        assert!(!sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_at_interval() {
        let source = ScriptedSource::new(vec![Ok(window(6)), Ok(window(12)), Ok(window(18))]);
        let sampler = RateSampler::with_defaults(source.clone());

        sampler.start();
        // ticks at 0s, 6s and 12s
        tokio::time::sleep(Duration::from_secs(13)).await;

        assert_eq!(source.calls(), 3);
        assert_eq!(sampler.current_value(), 3.0);
        assert_eq!(sampler.state().samples(), 3);

        sampler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_stop() {
        let source = ScriptedSource::new(vec![Ok(window(6)), Ok(window(60))]);
        let sampler = RateSampler::with_defaults(source.clone());

        sampler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sampler.stop().await;

        let value = sampler.current_value();
        let calls = source.calls();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(sampler.current_value(), value);
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_sample() {
        let sampler = RateSampler::with_defaults(Arc::new(SlowSource {
            delay: Duration::from_secs(2),
        }));

        sampler.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sampler.state().samples(), 0);

        assert!(sampler.stop().await);

        assert_eq!(sampler.current_value(), 10.0);
        assert_eq!(sampler.state().samples(), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_start() {
        let source = ScriptedSource::new(vec![Ok(window(6))]);
        let sampler = RateSampler::new(
            source.clone(),
            SamplerConfig {
                interval_seconds: 0,
                ..SamplerConfig::default()
            },
        );

        assert!(!sampler.start());
        assert!(!sampler.is_running());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let source = ScriptedSource::new(vec![Ok(window(6))]);
        let sampler = RateSampler::with_defaults(source.clone());

        sampler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sampler.stop().await;

        assert!(sampler.start());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 2);
        sampler.stop().await;
    }
}
