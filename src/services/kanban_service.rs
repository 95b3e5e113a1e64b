//! Kanban workflow state machine.
//!
//! Every status is reachable from every other by explicit user action.
//! Entering `snoozed` requires a deferral instant; leaving it clears the
//! deferral. The store applies each change as one atomic row update, so
//! concurrent moves are last-write-wins and `deferred_until` is set exactly
//! when the status is `snoozed` whichever write lands last.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Card, EmailId, EmailStatus, OwnerId};
use crate::storage::queries::emails::{self, StatusUpdate};
use crate::storage::{Database, DatabaseError};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum KanbanError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Email not found: {0}")]
    EmailNotFound(EmailId),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, KanbanError>;

/// Cards grouped by status token. Every status has an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub columns: BTreeMap<String, Vec<Card>>,
}

impl Board {
    /// Returns the cards in a status column, newest first.
    pub fn cards(&self, status: EmailStatus) -> &[Card] {
        self.columns
            .get(status.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Parses an RFC 3339 instant, e.g. `2099-01-01T00:00:00Z`.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KanbanError::InvalidTimestamp(format!("{:?}: {}", value, e)))
}

/// Applies status transitions to stored emails.
#[derive(Clone)]
pub struct KanbanService {
    db: Database,
}

impl KanbanService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Moves an email to the column named by a status token.
    pub async fn move_email(&self, owner_id: &OwnerId, email_id: &EmailId, to_status: &str) -> Result<()> {
        let status = to_status
            .trim()
            .parse::<EmailStatus>()
            .map_err(|e| KanbanError::InvalidTransition(e.to_string()))?;
        self.move_to(owner_id, email_id, status).await
    }

    /// Moves an email to `status`, clearing any deferral unless it stays snoozed.
    ///
    /// Moving an email that is not yet snoozed into `snoozed` is rejected;
    /// use [`snooze_until`](Self::snooze_until).
    pub async fn move_to(&self, owner_id: &OwnerId, email_id: &EmailId, status: EmailStatus) -> Result<()> {
        match emails::set_status(&self.db, owner_id, email_id, status).await? {
            StatusUpdate::Updated => {
                tracing::debug!(owner_id = %owner_id, email_id = %email_id, status = %status, "moved email");
                Ok(())
            }
            StatusUpdate::NotFound => Err(KanbanError::EmailNotFound(email_id.clone())),
            StatusUpdate::MissingDeferral => Err(KanbanError::InvalidTransition(
                "snoozed requires a deferral time".to_string(),
            )),
        }
    }

    /// Snoozes an email until an RFC 3339 instant, from any status.
    pub async fn snooze(&self, owner_id: &OwnerId, email_id: &EmailId, until: &str) -> Result<()> {
        let until = parse_instant(until)?;
        self.snooze_until(owner_id, email_id, until).await
    }

    /// Snoozes an email until `until`.
    ///
    /// A past instant is accepted; the scheduler restores the email on its next tick.
    pub async fn snooze_until(&self, owner_id: &OwnerId, email_id: &EmailId, until: DateTime<Utc>) -> Result<()> {
        if emails::set_snooze(&self.db, owner_id, email_id, until).await? {
            tracing::debug!(owner_id = %owner_id, email_id = %email_id, until = %until, "snoozed email");
            Ok(())
        } else {
            Err(KanbanError::EmailNotFound(email_id.clone()))
        }
    }

    /// Reads the owner's board: non-trashed emails grouped by status, newest first.
    pub async fn board(&self, owner_id: &OwnerId) -> Result<Board> {
        let mut columns: BTreeMap<String, Vec<Card>> = EmailStatus::all()
            .iter()
            .map(|status| (status.as_str().to_string(), Vec::new()))
            .collect();

        for email in emails::list_active(&self.db, owner_id).await? {
            columns
                .entry(email.status.as_str().to_string())
                .or_default()
                .push(Card::from(&email));
        }

        Ok(Board { columns })
    }
}
