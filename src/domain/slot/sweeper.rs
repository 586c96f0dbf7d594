//! Background completion of slots whose discussion window has closed.
//! Each pass also drops expired conversation states.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use super::service::SlotService;
use crate::state::AppState;
use crate::utils::error::AppError;

pub struct CompletionSweeper {
    state: AppState,
    interval: Duration,
}

impl CompletionSweeper {
    pub fn new(state: AppState) -> Self {
        let interval = Duration::from_secs(state.config.completion_sweep_secs.max(1));
        Self { state, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// One pass; returns the completed slot ids.
    pub async fn sweep_once(&self) -> Result<Vec<i32>, AppError> {
        self.state.conversations.purge_expired();

        let completed =
            SlotService::complete_due_slots(&self.state, Utc::now().naive_utc()).await?;
        if completed.is_empty() {
            debug!("No slots due for completion");
        } else {
            info!(count = completed.len(), slot_ids = ?completed, "Completed due slots");
        }
        Ok(completed)
    }

    /// Sweeps every interval until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting completion sweeper"
        );

        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Completion sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "Completion sweep failed");
                    }
                }
            }
        }
    }
}
