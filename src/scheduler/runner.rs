//! Completion scheduler runner.
//!
//! Every tick:
//! 1. Re-send results for completed giveaways that were never announced
//! 2. Load active giveaways and keep the ones whose end time has passed
//! 3. Run the completion process for each, independently
//!
//! A failure on one giveaway is logged and left for the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::completion::{CompletionOutcome, CompletionProcess};
use crate::config::DEFAULT_CHECK_INTERVAL_SECS;
use crate::store::{GiveawayStatus, GiveawayStore};
use crate::telegram::MessagingGateway;

/// Messages that can be sent to the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerMessage {
    /// Run a check right away.
    TriggerCheck,
    /// Stop the scheduler.
    Shutdown,
}

/// Closes expired giveaways on a fixed interval.
pub struct CompletionScheduler<G, S> {
    store: Arc<S>,
    process: CompletionProcess<G, S>,
    check_interval: Duration,
}

impl<G, S> CompletionScheduler<G, S>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    #[must_use]
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self {
            process: CompletionProcess::new(gateway, Arc::clone(&store)),
            store,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
        }
    }

    /// Sets the interval between checks.
    #[must_use]
    pub const fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Runs the scheduler loop until `Shutdown` or the sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        info!(
            "Completion scheduler started, checking every {:?}",
            self.check_interval
        );

        let mut check_timer = interval(self.check_interval);

        loop {
            tokio::select! {
                _ = check_timer.tick() => {
                    self.tick().await;
                }
                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::TriggerCheck) => {
                            debug!("Received trigger check message");
                            self.tick().await;
                        }
                        Some(SchedulerMessage::Shutdown) | None => {
                            info!("Scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Single tick of the scheduler.
    pub async fn tick(&self) {
        self.tick_at(Utc::now()).await;
    }

    async fn tick_at(&self, now: DateTime<Utc>) {
        self.retry_announcements().await;

        let active = match self.store.giveaways_by_status(GiveawayStatus::Active).await {
            Ok(active) => active,
            Err(e) => {
                error!("Failed to load active giveaways: {}", e);
                return;
            }
        };

        for giveaway in active.iter().filter(|g| g.is_due(now)) {
            info!(giveaway_id = %giveaway.id, "Completing giveaway \"{}\"", giveaway.title);

            match self.process.complete(giveaway).await {
                Ok(CompletionOutcome::Completed { winners, announced }) => {
                    info!(
                        giveaway_id = %giveaway.id,
                        winners,
                        announced,
                        "Giveaway completed"
                    );
                }
                Ok(CompletionOutcome::AlreadyCompleted) => {
                    debug!(giveaway_id = %giveaway.id, "Giveaway was already completed");
                }
                Err(e) => {
                    error!(giveaway_id = %giveaway.id, "Failed to complete giveaway: {}", e);
                }
            }
        }
    }

    async fn retry_announcements(&self) {
        let pending = match self.store.pending_announcements().await {
            Ok(pending) => pending,
            Err(e) => {
                error!("Failed to load unannounced giveaways: {}", e);
                return;
            }
        };

        for giveaway in &pending {
            match self.process.announce_pending(giveaway).await {
                Ok(true) => info!(giveaway_id = %giveaway.id, "Results announced on retry"),
                Ok(false) => debug!(giveaway_id = %giveaway.id, "Announcement still pending"),
                Err(e) => warn!(giveaway_id = %giveaway.id, "Announcement retry failed: {}", e),
            }
        }
    }
}

impl<G, S> std::fmt::Debug for CompletionScheduler<G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionScheduler")
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}
