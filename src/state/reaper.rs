//! Background eviction of idle sessions.
//!
//! A single long-lived task sweeps every map on a fixed interval and removes
//! sessions whose players have gone quiet. The sweep is two-phase (scan,
//! then remove, see [`MapRegistry::sweep_idle`]) and moderately expensive,
//! so it runs well below the idle threshold rather than continuously.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::map::MapRegistry;

/// How often the reaper sweeps.
pub const REAP_INTERVAL: Duration = Duration::from_secs(3 * 60);

/// Sessions idle strictly longer than this are evicted.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Periodic idle-session reaper.
pub struct IdleReaper {
    registry: Arc<MapRegistry>,
    interval: Duration,
    idle_timeout: Duration,
}

impl IdleReaper {
    /// Reaper with the production schedule.
    pub fn new(registry: Arc<MapRegistry>) -> Self {
        Self::with_timing(registry, REAP_INTERVAL, IDLE_TIMEOUT)
    }

    /// Reaper with a custom schedule (tests, tuning).
    pub fn with_timing(
        registry: Arc<MapRegistry>,
        interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            interval,
            idle_timeout,
        }
    }

    /// Start the sweep loop on the current tokio runtime.
    ///
    /// The loop runs until [`ReaperHandle::shutdown`] is called (or the
    /// handle is dropped); the shutdown signal is honored between sweeps.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately; skip it so
            // the first sweep happens one full interval after startup.
            ticker.tick().await;

            debug!("idle reaper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.registry.sweep_idle(self.idle_timeout);
                        if evicted > 0 {
                            info!("evicted {evicted} idle sessions");
                        } else {
                            debug!("idle sweep found nothing to evict");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("idle reaper stopped");
        });

        ReaperHandle { shutdown_tx, task }
    }
}

/// Handle for stopping a running reaper.
pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the reaper to stop and wait for its loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
