//! Periodic sync scheduler.
//!
//! Fires `full_sync` on a fixed interval while the remote service is
//! reachable. While it is not, each tick only re-asserts the offline status;
//! the first tick after connectivity returns runs a pass immediately.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};

use jot_core::{defaults, Error, Result};

use crate::engine::SyncEngine;

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between periodic passes.
    pub interval: Duration,
    /// Whether periodic syncing is enabled.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(defaults::SYNC_INTERVAL_SECS),
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOT_SYNC_ENABLED` | `true` | Enable/disable periodic syncing |
    /// | `JOT_SYNC_INTERVAL_SECS` | `30` | Seconds between passes |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOT_SYNC_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs = std::env::var("JOT_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SYNC_INTERVAL_SECS)
            .max(1);

        Self {
            interval: Duration::from_secs(interval_secs),
            enabled,
        }
    }

    /// Set the interval between passes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enable or disable periodic syncing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// Periodic sync driver.
pub struct SyncScheduler {
    engine: SyncEngine,
    config: SchedulerConfig,
}

impl SyncScheduler {
    pub fn new(engine: SyncEngine, config: SchedulerConfig) -> Self {
        Self { engine, config }
    }

    /// Start the scheduler and return a handle for control.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        SchedulerHandle { shutdown_tx }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "sync",
                component = "scheduler",
                "Sync scheduler is disabled, not starting"
            );
            return;
        }

        info!(
            subsystem = "sync",
            component = "scheduler",
            interval_secs = self.config.interval.as_secs(),
            "Sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(
                        subsystem = "sync",
                        component = "scheduler",
                        "Sync scheduler received shutdown signal"
                    );
                    break;
                }
                _ = sleep(self.config.interval) => {
                    self.tick().await;
                }
            }
        }

        info!(
            subsystem = "sync",
            component = "scheduler",
            "Sync scheduler stopped"
        );
    }

    async fn tick(&self) {
        if self.engine.is_online().await {
            let report = self.engine.full_sync().await;
            debug!(
                subsystem = "sync",
                component = "scheduler",
                uploaded = report.uploaded.total(),
                merged = report.merged.total(),
                "Periodic sync pass finished"
            );
        } else {
            // The tick is not a reconciliation attempt; it only keeps the
            // flag and its subscribers current.
            self.engine.status().assert_offline();
            debug!(
                subsystem = "sync",
                component = "scheduler",
                "Skipping periodic sync while offline"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(
            config.interval,
            Duration::from_secs(defaults::SYNC_INTERVAL_SECS)
        );
        assert!(config.enabled);
    }

    #[test]
    fn test_scheduler_config_builder() {
        let config = SchedulerConfig::default()
            .with_interval(Duration::from_millis(250))
            .with_enabled(false);

        assert_eq!(config.interval, Duration::from_millis(250));
        assert!(!config.enabled);
    }
}
