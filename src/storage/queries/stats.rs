//! Aggregate queries for mailbox statistics.
//!
//! All counts exclude trashed mail. Date buckets are UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use rusqlite::params;

use crate::domain::{
    system_labels, ActivityCell, EmailStatus, MailboxTotals, OwnerId, StatusCount, TopSender,
    TrendPoint,
};
use crate::storage::database::{format_timestamp, parse_timestamp, Database, Result};

/// Counts emails per workflow status, largest first.
///
/// Stored values that are empty or unknown count as inbox.
pub async fn status_counts(db: &Database, owner_id: &OwnerId) -> Result<Vec<StatusCount>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM emails
             WHERE owner_id = ?1 AND trashed = 0
             GROUP BY status",
        )?;
        let rows = stmt.query_map([&owner_id.0], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for row in rows {
            let (status, count) = row?;
            let status = EmailStatus::from_stored(&status);
            let position = EmailStatus::all()
                .iter()
                .position(|s| *s == status)
                .unwrap_or_default();
            *counts.entry(position).or_default() += count as usize;
        }

        let mut stats: Vec<StatusCount> = counts
            .into_iter()
            .map(|(position, count)| StatusCount {
                status: EmailStatus::all()[position],
                count,
            })
            .collect();
        // Stable: equal counts keep board order.
        stats.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(stats)
    })
    .await
}

/// Emails received per day since `since`, oldest day first.
pub async fn received_trend(
    db: &Database,
    owner_id: &OwnerId,
    since: DateTime<Utc>,
) -> Result<Vec<TrendPoint>> {
    let owner_id = owner_id.clone();
    let since = format_timestamp(&since);

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT substr(received_at, 1, 10) AS day, COUNT(*) FROM emails
             WHERE owner_id = ?1 AND trashed = 0 AND received_at >= ?2
             GROUP BY day
             ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(params![owner_id.0, since], |row| {
            let day: String = row.get(0)?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(TrendPoint {
                date,
                count: row.get::<_, i64>(1)? as usize,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Senders with the most mail, ties broken by address.
pub async fn top_senders(db: &Database, owner_id: &OwnerId, limit: usize) -> Result<Vec<TopSender>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT from_name, from_address, COUNT(*) AS n FROM emails
             WHERE owner_id = ?1 AND trashed = 0
             GROUP BY from_name, from_address
             ORDER BY n DESC, from_address ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![owner_id.0, limit as i64], |row| {
            Ok(TopSender {
                name: row.get(0)?,
                email: row.get(1)?,
                count: row.get::<_, i64>(2)? as usize,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Emails received since `since`, bucketed by weekday and hour.
pub async fn activity(
    db: &Database,
    owner_id: &OwnerId,
    since: DateTime<Utc>,
) -> Result<Vec<ActivityCell>> {
    let owner_id = owner_id.clone();
    let since = format_timestamp(&since);

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT received_at FROM emails
             WHERE owner_id = ?1 AND trashed = 0 AND received_at >= ?2",
        )?;
        let rows = stmt.query_map(params![owner_id.0, since], |row| {
            let value: String = row.get(0)?;
            parse_timestamp(0, &value)
        })?;

        let mut cells: BTreeMap<(u32, u32), usize> = BTreeMap::new();
        for received_at in rows {
            let received_at = received_at?;
            let key = (received_at.weekday().num_days_from_sunday(), received_at.hour());
            *cells.entry(key).or_default() += 1;
        }

        Ok(cells
            .into_iter()
            .map(|((day_of_week, hour), count)| ActivityCell {
                day_of_week,
                hour,
                count,
            })
            .collect())
    })
    .await
}

/// Total, unread and starred counts outside the trash.
pub async fn totals(db: &Database, owner_id: &OwnerId) -> Result<MailboxTotals> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let (total, unread, starred): (i64, i64, i64) = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(EXISTS (SELECT 1 FROM json_each(emails.labels) WHERE value = ?2)), 0),
                COALESCE(SUM(EXISTS (SELECT 1 FROM json_each(emails.labels) WHERE value = ?3)), 0)
             FROM emails
             WHERE owner_id = ?1 AND trashed = 0",
            params![owner_id.0, system_labels::UNREAD, system_labels::STARRED],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(MailboxTotals {
            total: total as usize,
            unread: unread as usize,
            starred: starred as usize,
        })
    })
    .await
}
