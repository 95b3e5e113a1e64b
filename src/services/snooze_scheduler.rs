//! Background restoration of snoozed emails.
//!
//! The [`SnoozeScheduler`] wakes on a fixed interval, finds snoozed emails
//! whose deferral has elapsed and moves them back to the inbox. A tick that
//! fires while the previous one is still running is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::kanban_service::KanbanService;
use crate::domain::EmailStatus;
use crate::storage::queries::emails;
use crate::storage::Database;

/// Outcome of one scheduler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Emails moved back to the inbox.
    pub restored: usize,
    /// Emails that could not be moved.
    pub failed: usize,
}

pub struct SnoozeScheduler {
    db: Database,
    kanban: KanbanService,
    interval: Duration,
    running: Arc<Semaphore>,
}

impl SnoozeScheduler {
    pub fn new(db: Database, interval: Duration) -> Self {
        Self {
            kanban: KanbanService::new(db.clone()),
            db,
            interval,
            running: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one pass unless another is in progress, in which case returns `None`.
    pub async fn try_tick(&self) -> Option<TickReport> {
        let _permit = match Arc::clone(&self.running).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("Previous snooze check still running, skipping tick");
                return None;
            }
        };
        Some(self.restore_due(Utc::now()).await)
    }

    /// Moves every email due at `now` back to the inbox.
    ///
    /// Per-item failures are logged and counted; they do not stop the pass.
    pub async fn restore_due(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let due = match emails::snoozed_due(&self.db, now).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!("Failed to query due snoozes: {}", e);
                return report;
            }
        };

        for (owner_id, email_id) in due {
            match self.kanban.move_to(&owner_id, &email_id, EmailStatus::Inbox).await {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        owner_id = %owner_id,
                        email_id = %email_id,
                        "Failed to restore snoozed email: {}",
                        e
                    );
                }
            }
        }

        if report.restored > 0 || report.failed > 0 {
            tracing::info!(
                restored = report.restored,
                failed = report.failed,
                "Restored snoozed emails"
            );
        }
        report
    }

    /// Ticks until `cancel` fires. A pass in progress finishes before returning.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Snooze scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.try_tick().await;
                }
            }
        }

        tracing::info!("Snooze scheduler stopped");
    }

    /// Spawns [`run`](Self::run) on the runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
