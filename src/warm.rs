//! Warm-cache refresh loop
//!
//! Keeps a fixed set of requests pre-populated in the server-role cache by
//! re-running them with a forced rebuild: once at startup, then on a fixed
//! interval. Cycles run one at a time inside a single task; when a cycle outlives
//! the interval the missed ticks are skipped rather than stacked.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::fetcher::{BatchItem, CachePolicy, Fetcher};

/// Events emitted by the refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmEvent {
    /// A refresh cycle started
    CycleStarted { cycle: u64 },
    /// A refresh cycle finished
    CycleCompleted {
        cycle: u64,
        refreshed: usize,
        failed: usize,
    },
}

/// Configuration for the refresh loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmCacheConfig {
    /// Registry names to keep warm
    pub requests: Vec<String>,
    /// Delay between the start of consecutive cycles
    pub interval: Duration,
}

impl Default for WarmCacheConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for WarmCacheConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            requests: config.warm_cache.clone(),
            interval: config.warm_interval,
        }
    }
}

impl WarmCacheConfig {
    fn batch(&self) -> BTreeMap<String, BatchItem> {
        self.requests
            .iter()
            .map(|name| (name.clone(), BatchItem::default()))
            .collect()
    }
}

/// Handle for controlling the refresh loop
pub struct WarmCacheHandle {
    /// Channel for receiving cycle events
    pub receiver: mpsc::Receiver<WarmEvent>,
    /// Signals shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl WarmCacheHandle {
    /// Spawns the refresh loop for a server-role fetcher
    ///
    /// Returns `None` for client-role fetchers, which never warm.
    pub fn spawn(fetcher: Arc<Fetcher>, config: WarmCacheConfig) -> Option<Self> {
        if !fetcher.role().runs_warm_cache() {
            debug!(role = %fetcher.role(), "warm cache disabled for role");
            return None;
        }

        let (event_tx, event_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let batch = config.batch();
            // tokio rejects a zero period
            let period = config.interval.max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut cycle = 0u64;

            info!(
                requests = batch.len(),
                interval_secs = config.interval.as_secs(),
                "warm cache started"
            );

            loop {
                // The first tick completes immediately
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.recv() => break,
                }

                cycle += 1;
                publish(&event_tx, WarmEvent::CycleStarted { cycle });

                let run = fetcher.fetch_many(&batch, CachePolicy::rebuild());
                let outcomes = tokio::select! {
                    outcomes = run => outcomes,
                    _ = shutdown_rx.recv() => break,
                };

                let refreshed = outcomes.values().filter(|o| o.is_success()).count();
                let failed = outcomes.len() - refreshed;
                if failed > 0 {
                    warn!(cycle, refreshed, failed, "warm cache cycle incomplete");
                } else {
                    debug!(cycle, refreshed, "warm cache cycle complete");
                }
                publish(
                    &event_tx,
                    WarmEvent::CycleCompleted {
                        cycle,
                        refreshed,
                        failed,
                    },
                );
            }

            info!("warm cache stopped");
        });

        Some(Self {
            receiver: event_rx,
            shutdown_tx,
        })
    }

    /// Waits for the next event, or `None` once the loop has stopped
    pub async fn next_event(&mut self) -> Option<WarmEvent> {
        self.receiver.recv().await
    }

    /// Stops the refresh loop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Sends an event without waiting; events are dropped when nobody is reading
fn publish(tx: &mpsc::Sender<WarmEvent>, event: WarmEvent) {
    let _ = tx.try_send(event);
}

/// Checks for a pending event without blocking
pub fn try_recv(handle: &mut WarmCacheHandle) -> Option<WarmEvent> {
    handle.receiver.try_recv().ok()
}
