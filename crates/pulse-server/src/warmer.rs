//! Background refresh of the exchange wallets.
//!
//! Wallet snapshots need two API calls each and the dashboard shows all of
//! them at once, so a task refreshes them on a slow cadence and the durable
//! store keeps the results across restarts. Wallets are fetched one at a
//! time with a pause in between to stay under the API's rate limit.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use crate::datasets::{Dataset, DatasetLoader};
use crate::settings::{WalletList, WarmerSettings};

/// Outcome of one warm-up round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Wallets whose fetch succeeded.
    pub refreshed: usize,
    /// Wallets served from an older value or not loaded at all.
    pub failed: usize,
    /// True if shutdown interrupted the round.
    pub interrupted: bool,
}

struct WarmerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct WarmerInner {
    loader: DatasetLoader,
    wallets: WalletList,
    settings: WarmerSettings,
}

/// Periodically forces a refresh of every tracked wallet.
pub struct WalletWarmer {
    inner: Arc<WarmerInner>,
    running: Mutex<Option<WarmerHandle>>,
}

impl WalletWarmer {
    pub fn new(loader: DatasetLoader, wallets: WalletList, settings: WarmerSettings) -> Self {
        Self {
            inner: Arc::new(WarmerInner {
                loader,
                wallets,
                settings,
            }),
            running: Mutex::new(None),
        }
    }

    /// Starts the loop. The first round runs immediately.
    ///
    /// Returns `false` if already running or the interval is zero.
    pub fn start(&self) -> bool {
        if self.inner.settings.interval().is_zero() {
            warn!("Wallet warmer interval is zero, not starting");
            return false;
        }

        let mut running = self.running.lock();
        if running.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&self.inner).run(shutdown_rx));

        *running = Some(WarmerHandle { shutdown_tx, task });
        true
    }

    /// Stops the loop, interrupting a round between two wallets.
    pub async fn stop(&self) -> bool {
        let handle = self.running.lock().take();
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.shutdown_tx.send(true);
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Wallet warmer task ended abnormally");
        }

        info!("Wallet warmer stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Runs one full round now.
    pub async fn warm_once(&self) -> WarmReport {
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.inner.warm(&mut shutdown_rx).await
    }
}

impl Drop for WalletWarmer {
    fn drop(&mut self) {
        if let Some(handle) = self.running.get_mut().take() {
            let _ = handle.shutdown_tx.send(true);
        }
    }
}

impl WarmerInner {
    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut timer = interval(self.settings.interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            wallets = self.wallets.len(),
            interval_secs = self.settings.interval_seconds,
            "Starting wallet warmer"
        );

        loop {
            tokio::select! {
                biased;
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        debug!("Wallet warmer shutting down");
                        break;
                    }
                }
                _ = timer.tick() => {
                    let report = self.warm(&mut shutdown_rx).await;
                    if report.interrupted {
                        break;
                    }
                }
            }
        }
    }

    async fn warm(&self, shutdown_rx: &mut watch::Receiver<bool>) -> WarmReport {
        let mut report = WarmReport::default();

        for (index, wallet) in self.wallets.iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        report.interrupted = true;
                        break;
                    }
                    _ = sleep(self.settings.spacing()) => {}
                }
            }

            match self.loader.refresh(&Dataset::wallet(wallet)).await {
                Ok((_, lookup)) if !lookup.is_stale() => report.refreshed += 1,
                Ok((_, lookup)) => {
                    report.failed += 1;
                    debug!(
                        wallet = %wallet.name,
                        reason = lookup.stale_reason().unwrap_or_default(),
                        "Wallet refresh failed, previous value kept"
                    );
                },
                Err(err) => {
                    report.failed += 1;
                    warn!(wallet = %wallet.name, error = %err, "Wallet refresh failed");
                },
            }
        }

        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            interrupted = report.interrupted,
            "Wallet warm-up round finished"
        );
        report
    }
}
