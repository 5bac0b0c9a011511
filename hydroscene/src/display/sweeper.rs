//! Background heartbeat sweep.
//!
//! Runs [`DisplayRegistry::sweep`] on a fixed period that does not depend
//! on scene transitions or metric load.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::registry::DisplayRegistry;

/// Periodic liveness sweep over the display registry.
pub struct HeartbeatSweeper {
    registry: DisplayRegistry,
    interval: Duration,
}

impl HeartbeatSweeper {
    /// Create a sweeper using the registry's configured sweep interval.
    pub fn new(registry: DisplayRegistry) -> Self {
        let interval = registry.config().sweep_interval;
        Self { registry, interval }
    }

    /// Override the sweep period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sweep until shutdown is signalled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.registry.config().heartbeat_timeout.as_secs(),
            "Heartbeat sweeper starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Heartbeat sweeper shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let flipped = self.registry.sweep();
                    if !flipped.is_empty() {
                        debug!(count = flipped.len(), "Heartbeat sweep marked displays offline");
                    }
                }
            }
        }
    }
}
