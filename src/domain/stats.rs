//! Mailbox statistics types.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::EmailStatus;

/// Look-back window for trend and activity statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatsPeriod {
    /// Last 7 days.
    #[serde(rename = "7d")]
    Week,
    /// Last 30 days.
    #[default]
    #[serde(rename = "30d")]
    Month,
    /// Last 90 days.
    #[serde(rename = "90d")]
    Quarter,
}

impl StatsPeriod {
    /// Parses a period token. Anything other than `7d` or `90d` is the 30 day default.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("7d") => StatsPeriod::Week,
            Some("90d") => StatsPeriod::Quarter,
            _ => StatsPeriod::Month,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
            StatsPeriod::Quarter => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Week => "7d",
            StatsPeriod::Month => "30d",
            StatsPeriod::Quarter => "90d",
        }
    }

    /// Start of the window ending at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

/// Number of emails in one workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: EmailStatus,
    pub count: usize,
}

/// Emails received on one calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: usize,
}

/// A sender ranked by message count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSender {
    pub name: Option<String>,
    pub email: String,
    pub count: usize,
}

/// Emails received in one weekday/hour cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCell {
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u32,
    /// 0-23, UTC.
    pub hour: u32,
    pub count: usize,
}

/// Mailbox totals outside the trash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxTotals {
    pub total: usize,
    pub unread: usize,
    pub starred: usize,
}

/// Complete statistics for one owner and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub period: StatsPeriod,
    /// Sorted by count, largest first.
    pub status_counts: Vec<StatusCount>,
    /// One point per day with mail, oldest first.
    pub trend: Vec<TrendPoint>,
    pub top_senders: Vec<TopSender>,
    /// Sorted by weekday then hour.
    pub activity: Vec<ActivityCell>,
    pub totals: MailboxTotals,
    pub generated_at: DateTime<Utc>,
}
