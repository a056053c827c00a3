//! Periodic maintenance: offer expiry, block release and reminders.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::engine::MatchingEngine;
use crate::sender::NotificationSender;

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Runs [`MatchingEngine::sweep`] on a fixed period.
pub struct Sweeper<S: NotificationSender> {
    engine: Arc<MatchingEngine<S>>,
    period: Duration,
}

impl<S: NotificationSender + 'static> Sweeper<S> {
    /// Create a sweeper with the default 30 second period.
    pub fn new(engine: Arc<MatchingEngine<S>>) -> Self {
        Self {
            engine,
            period: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Set the sweep period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sweep until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period = ?self.period, "Starting sweeper");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.sweep().await {
                        Ok(report) => debug!(?report, "Sweep finished"),
                        // Keep sweeping; the next tick retries
                        Err(e) => error!("Sweep failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Sweeper stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Run the sweeper on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
