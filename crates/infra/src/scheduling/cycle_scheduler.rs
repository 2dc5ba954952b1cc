//! Interval-based scheduler for automatic sync cycles.
//!
//! Runs a full fetch-and-reconcile cycle at a configurable interval with a
//! 60-second floor. A tick that finds a cycle already in flight (manual
//! trigger, overlapping tick) is simply skipped: the orchestrator's queue
//! gate reports `Busy` and the scheduler waits for the next tick.

use std::sync::Arc;
use std::time::Duration;

use punchbridge_core::SyncService;
use punchbridge_domain::constants::MIN_SYNC_INTERVAL_SECS;
use punchbridge_domain::{BridgeError, CycleOptions};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Type alias for the background task handle.
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the cycle scheduler.
#[derive(Debug, Clone)]
pub struct CycleSchedulerConfig {
    /// Interval between cycles; clamped to the 60s floor.
    pub interval: Duration,
    /// Options passed to every scheduled cycle.
    pub options: CycleOptions,
}

impl Default for CycleSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(MIN_SYNC_INTERVAL_SECS),
            options: CycleOptions::default(),
        }
    }
}

/// Scheduler that drives periodic sync cycles.
pub struct CycleScheduler {
    service: Arc<SyncService>,
    config: CycleSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl CycleScheduler {
    pub fn new(service: Arc<SyncService>, config: CycleSchedulerConfig) -> Self {
        let mut config = config;
        config.interval = clamp_interval(config.interval);

        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is already running.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "starting cycle scheduler");

        // A fresh token supports restart after stop.
        self.cancellation_token = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::cycle_loop(service, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the scheduler gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is not running or the task does
    /// not stop within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("stopping cycle scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::StopTimeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("cycle scheduler stopped");
        Ok(())
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn cycle_loop(
        service: Arc<SyncService>,
        config: CycleSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("cycle loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    match service.run_cycle(&config.options).await {
                        Ok(summary) => {
                            debug!(
                                imported = summary.imported,
                                synced = summary.synced,
                                "scheduled cycle finished"
                            );
                        }
                        // Another trigger beat us to it; the next tick
                        // will pick up whatever is left.
                        Err(BridgeError::Busy(_)) => debug!("cycle already in flight, tick skipped"),
                        // No credentials / no terminals yet. Expected
                        // before first login, so keep ticking quietly.
                        Err(BridgeError::Config(reason)) => {
                            debug!(reason, "cycle not runnable yet")
                        }
                        Err(e) => warn!(error = %e, "scheduled cycle failed"),
                    }
                }
            }
        }
    }
}

/// Enforce the interval floor. Anything faster would hammer terminals that
/// are often on slow embedded network stacks.
fn clamp_interval(interval: Duration) -> Duration {
    let floor = Duration::from_secs(MIN_SYNC_INTERVAL_SECS);
    if interval < floor {
        warn!(
            configured_secs = interval.as_secs(),
            floor_secs = floor.as_secs(),
            "interval below floor, clamping"
        );
        return floor;
    }
    interval
}

impl Drop for CycleScheduler {
    fn drop(&mut self) {
        // Abort rather than leak the task when the owner forgets stop().
        self.cancellation_token.cancel();
        if let Ok(mut guard) = self.task_handle.try_lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_clamped_to_the_floor() {
        assert_eq!(
            clamp_interval(Duration::from_secs(5)),
            Duration::from_secs(MIN_SYNC_INTERVAL_SECS)
        );
        assert_eq!(clamp_interval(Duration::from_secs(300)), Duration::from_secs(300));
    }
}
