//! Background retention sweeps
//!
//! The evictor is an owned task: `spawn` starts it, `EvictorHandle::stop`
//! signals it and waits for the loop to exit. A sweep in progress always
//! runs to completion; the stop signal is only observed between ticks.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::storage::engine::Store;

/// Periodic sweeper for a [`Store`]
pub struct Evictor;

impl Evictor {
    /// Start sweeping `store` every `retention().sweep_interval`
    pub fn spawn(store: Arc<Store>) -> EvictorHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let period = store.retention().sweep_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(period_ms = period.as_millis() as u64, "Evictor started");

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {}
                }
                if *stopped.borrow() {
                    break;
                }

                let report = store.sweep().await;
                if report.buckets_evicted > 0 {
                    tracing::debug!(
                        boundary = %report.boundary,
                        mode = ?report.mode,
                        buckets = report.buckets_evicted,
                        samples = report.samples_evicted,
                        "Swept expired buckets"
                    );
                }
            }

            tracing::info!("Evictor stopped");
        });

        EvictorHandle { shutdown, task }
    }
}

/// Lifecycle handle for a running evictor
pub struct EvictorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl EvictorHandle {
    /// Signal the evictor and wait for it to finish its current tick
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Evictor task failed: {}", e);
        }
    }
}
