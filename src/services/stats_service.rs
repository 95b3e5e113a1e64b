//! Mailbox statistics for the dashboard.
//!
//! Aggregates:
//! - Status distribution across the workflow
//! - Received-mail trend and weekday/hour activity over a period
//! - Top senders and mailbox totals

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{OwnerId, StatsPeriod, StatsReport};
use crate::storage::queries::stats;
use crate::storage::{Database, DatabaseError};

const TOP_SENDERS: usize = 10;

/// Errors that can occur while computing statistics.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for stats operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Computes statistics reports from the local index.
#[derive(Clone)]
pub struct StatsService {
    db: Database,
}

impl StatsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Generates a report for the period ending now.
    pub async fn report(&self, owner_id: &OwnerId, period: StatsPeriod) -> Result<StatsReport> {
        self.report_at(owner_id, period, Utc::now()).await
    }

    /// Generates a report for the period ending at `now`.
    pub async fn report_at(
        &self,
        owner_id: &OwnerId,
        period: StatsPeriod,
        now: DateTime<Utc>,
    ) -> Result<StatsReport> {
        let since = period.start(now);

        let status_counts = stats::status_counts(&self.db, owner_id).await?;
        let trend = stats::received_trend(&self.db, owner_id, since).await?;
        let top_senders = stats::top_senders(&self.db, owner_id, TOP_SENDERS).await?;
        let activity = stats::activity(&self.db, owner_id, since).await?;
        let totals = stats::totals(&self.db, owner_id).await?;

        tracing::debug!(
            owner_id = %owner_id,
            period = period.as_str(),
            total = totals.total,
            "stats report generated"
        );

        Ok(StatsReport {
            period,
            status_counts,
            trend,
            top_senders,
            activity,
            totals,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Email, EmailStatus};
    use crate::services::testing::at;
    use crate::storage::queries::emails;

    #[tokio::test]
    async fn period_limits_trend_but_not_totals() {
        let db = Database::open_in_memory().await.unwrap();
        let rows: Vec<Email> = [(1, "a"), (10, "b"), (25, "c"), (28, "d")]
            .into_iter()
            .map(|(day, id)| {
                Email::new(id, "u1", at(day, 10)).with_from(Address::new("ops@example.com"))
            })
            .collect();
        emails::upsert_many(&db, rows).await.unwrap();

        let service = StatsService::new(db);
        let now = at(30, 0);

        let week = service
            .report_at(&"u1".into(), StatsPeriod::Week, now)
            .await
            .unwrap();
        assert_eq!(week.period, StatsPeriod::Week);
        assert_eq!(week.trend.iter().map(|p| p.count).sum::<usize>(), 2);
        assert_eq!(week.activity.iter().map(|c| c.count).sum::<usize>(), 2);
        assert_eq!(week.totals.total, 4);
        assert_eq!(week.status_counts[0].status, EmailStatus::Inbox);
        assert_eq!(week.status_counts[0].count, 4);
        assert_eq!(week.top_senders[0].count, 4);
        assert_eq!(week.generated_at, now);

        let month = service
            .report_at(&"u1".into(), StatsPeriod::Month, now)
            .await
            .unwrap();
        assert_eq!(month.trend.len(), 4);
    }

    #[tokio::test]
    async fn empty_mailbox_gives_empty_report() {
        let db = Database::open_in_memory().await.unwrap();
        let report = StatsService::new(db)
            .report(&"nobody".into(), StatsPeriod::default())
            .await
            .unwrap();
        assert!(report.status_counts.is_empty());
        assert!(report.trend.is_empty());
        assert!(report.top_senders.is_empty());
        assert_eq!(report.totals.total, 0);
        assert_eq!(report.period, StatsPeriod::Month);
    }
}
