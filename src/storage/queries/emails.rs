//! Email queries.
//!
//! Every read and mutation is scoped by owner except the snooze due scan,
//! which the background scheduler runs across all owners. Each search mode
//! has its own typed entry point; callers never assemble SQL filters.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{Address, Email, EmailId, EmailStatus, OwnerId};
use crate::search::text::relaxed_pattern;
use crate::storage::database::{
    format_timestamp, parse_timestamp, Database, DatabaseError, Result,
};

const EMAIL_COLUMNS: &str = "id, owner_id, subject, body_text, preview, from_address, from_name, \
     received_at, status, deferred_until, summary, embedding, labels";

/// Accent-insensitive text search over subject, sender, summary and body.
#[derive(Debug, Clone)]
pub struct TextSearch {
    owner_id: OwnerId,
    pattern: String,
    limit: usize,
}

impl TextSearch {
    /// Builds a case- and accent-insensitive search for `query`.
    pub fn relaxed(owner_id: &OwnerId, query: &str, limit: usize) -> Self {
        Self {
            owner_id: owner_id.clone(),
            pattern: format!("(?i){}", relaxed_pattern(query.trim())),
            limit,
        }
    }

    /// Returns the compiled pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Outcome of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated,
    NotFound,
    /// Entering `snoozed` needs a deferral time; use [`set_snooze`].
    MissingDeferral,
}

/// Inserts or refreshes an email, preserving local workflow state.
///
/// On conflict `status`, `deferred_until` and `embedding` keep their stored
/// values, and a stored non-empty summary is never replaced.
pub async fn upsert(db: &Database, email: &Email) -> Result<()> {
    upsert_many(db, vec![email.clone()]).await.map(|_| ())
}

/// Upserts a batch of emails in one transaction. Returns the number written.
pub async fn upsert_many(db: &Database, emails: Vec<Email>) -> Result<usize> {
    db.transaction(move |tx| {
        let now = format_timestamp(&Utc::now());
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO emails (
                id, owner_id, subject, body_text, preview, from_address, from_name,
                received_at, status, deferred_until, summary, embedding, embedding_dim,
                labels, trashed, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?16
            )
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                subject = excluded.subject,
                body_text = excluded.body_text,
                preview = excluded.preview,
                from_address = excluded.from_address,
                from_name = excluded.from_name,
                received_at = excluded.received_at,
                summary = COALESCE(NULLIF(emails.summary, ''), excluded.summary),
                labels = excluded.labels,
                trashed = excluded.trashed,
                updated_at = excluded.updated_at
            "#,
        )?;

        for email in &emails {
            let labels_json = serde_json::to_string(&email.labels)?;
            let embedding_json = email
                .embedding
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let summary = email.summary.as_deref().filter(|s| !s.trim().is_empty());

            stmt.execute(params![
                email.id.0,
                email.owner_id.0,
                email.subject,
                email.body_text,
                email.preview,
                email.from.email,
                email.from.name,
                format_timestamp(&email.received_at),
                email.status.as_str(),
                email.deferred_until.as_ref().map(format_timestamp),
                summary,
                embedding_json,
                email.embedding.as_ref().map(|v| v.len() as i64),
                labels_json,
                email.is_trashed() as i32,
                now,
            ])?;
        }

        Ok(emails.len())
    })
    .await
}

/// Retrieves an email by id within an owner's partition.
pub async fn get_by_id(db: &Database, owner_id: &OwnerId, email_id: &EmailId) -> Result<Option<Email>> {
    let owner_id = owner_id.clone();
    let email_id = email_id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM emails WHERE id = ?1 AND owner_id = ?2",
            EMAIL_COLUMNS
        );
        let result = conn
            .query_row(&sql, params![email_id.0, owner_id.0], row_to_email)
            .optional()?;
        Ok(result)
    })
    .await
}

/// Runs a text search, newest first, excluding trash.
pub async fn search_text(db: &Database, search: TextSearch) -> Result<Vec<Email>> {
    db.with_conn(move |conn| {
        let sql = format!(
            r#"
            SELECT {} FROM emails
            WHERE owner_id = ?1
              AND trashed = 0
              AND (
                  subject REGEXP ?2
                  OR from_name REGEXP ?2
                  OR from_address REGEXP ?2
                  OR summary REGEXP ?2
                  OR body_text REGEXP ?2
              )
            ORDER BY received_at DESC, id ASC
            LIMIT ?3
            "#,
            EMAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![search.owner_id.0, search.pattern, search.limit as i64],
            row_to_email,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Returns every non-trashed email of an owner, newest first.
///
/// Feeds both the fuzzy fallback scan and the Kanban board.
pub async fn list_active(db: &Database, owner_id: &OwnerId) -> Result<Vec<Email>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM emails WHERE owner_id = ?1 AND trashed = 0 \
             ORDER BY received_at DESC, id ASC",
            EMAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([&owner_id.0], row_to_email)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Sets the workflow status, clearing `deferred_until` unless the target is snoozed.
pub async fn set_status(
    db: &Database,
    owner_id: &OwnerId,
    email_id: &EmailId,
    status: EmailStatus,
) -> Result<StatusUpdate> {
    let owner_id = owner_id.clone();
    let email_id = email_id.clone();

    db.with_conn(move |conn| {
        let now = format_timestamp(&Utc::now());

        let changed = if status == EmailStatus::Snoozed {
            conn.execute(
                "UPDATE emails SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND owner_id = ?4 AND deferred_until IS NOT NULL",
                params![status.as_str(), now, email_id.0, owner_id.0],
            )?
        } else {
            conn.execute(
                "UPDATE emails SET status = ?1, deferred_until = NULL, updated_at = ?2
                 WHERE id = ?3 AND owner_id = ?4",
                params![status.as_str(), now, email_id.0, owner_id.0],
            )?
        };

        if changed > 0 {
            return Ok(StatusUpdate::Updated);
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM emails WHERE id = ?1 AND owner_id = ?2",
                params![email_id.0, owner_id.0],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match exists {
            Some(_) => StatusUpdate::MissingDeferral,
            None => StatusUpdate::NotFound,
        })
    })
    .await
}

/// Snoozes an email until the given instant. Returns false if it does not exist.
pub async fn set_snooze(
    db: &Database,
    owner_id: &OwnerId,
    email_id: &EmailId,
    until: DateTime<Utc>,
) -> Result<bool> {
    let owner_id = owner_id.clone();
    let email_id = email_id.clone();

    db.with_conn(move |conn| {
        let now = format_timestamp(&Utc::now());
        let changed = conn.execute(
            "UPDATE emails SET status = ?1, deferred_until = ?2, updated_at = ?3
             WHERE id = ?4 AND owner_id = ?5",
            params![
                EmailStatus::Snoozed.as_str(),
                format_timestamp(&until),
                now,
                email_id.0,
                owner_id.0
            ],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Lists snoozed emails whose deferral has elapsed, across all owners.
pub async fn snoozed_due(db: &Database, now: DateTime<Utc>) -> Result<Vec<(OwnerId, EmailId)>> {
    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT owner_id, id FROM emails
             WHERE status = ?1 AND deferred_until <= ?2
             ORDER BY deferred_until ASC",
        )?;
        let rows = stmt.query_map(
            params![EmailStatus::Snoozed.as_str(), format_timestamp(&now)],
            |row| Ok((OwnerId(row.get(0)?), EmailId(row.get(1)?))),
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Stores a generated summary. Returns false if the email does not exist.
pub async fn set_summary(
    db: &Database,
    owner_id: &OwnerId,
    email_id: &EmailId,
    summary: &str,
) -> Result<bool> {
    let owner_id = owner_id.clone();
    let email_id = email_id.clone();
    let summary = summary.to_string();

    db.with_conn(move |conn| {
        let changed = conn.execute(
            "UPDATE emails SET summary = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![summary, format_timestamp(&Utc::now()), email_id.0, owner_id.0],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Stores an embedding vector.
///
/// All vectors of one owner share a dimension; a vector of a different
/// length is rejected with [`DatabaseError::DimensionMismatch`].
pub async fn set_embedding(
    db: &Database,
    owner_id: &OwnerId,
    email_id: &EmailId,
    embedding: Vec<f32>,
) -> Result<bool> {
    let owner_id = owner_id.clone();
    let email_id = email_id.clone();

    db.transaction(move |tx| {
        let dim = embedding.len();
        let existing: Option<i64> = tx
            .query_row(
                "SELECT embedding_dim FROM emails
                 WHERE owner_id = ?1 AND embedding_dim IS NOT NULL AND embedding_dim != ?2
                 LIMIT 1",
                params![owner_id.0, dim as i64],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(expected) = existing {
            return Err(DatabaseError::DimensionMismatch {
                expected: expected as usize,
                actual: dim,
            });
        }

        let json = serde_json::to_string(&embedding)?;
        let changed = tx.execute(
            "UPDATE emails SET embedding = ?1, embedding_dim = ?2, updated_at = ?3
             WHERE id = ?4 AND owner_id = ?5",
            params![
                json,
                dim as i64,
                format_timestamp(&Utc::now()),
                email_id.0,
                owner_id.0
            ],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Returns non-trashed emails of an owner that have an embedding.
pub async fn with_embeddings(db: &Database, owner_id: &OwnerId) -> Result<Vec<Email>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM emails
             WHERE owner_id = ?1 AND trashed = 0 AND embedding IS NOT NULL
             ORDER BY received_at DESC, id ASC",
            EMAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([&owner_id.0], row_to_email)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Returns up to `limit` non-trashed emails without an embedding, newest first.
pub async fn missing_embeddings(db: &Database, owner_id: &OwnerId, limit: usize) -> Result<Vec<Email>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM emails
             WHERE owner_id = ?1 AND trashed = 0 AND (embedding IS NULL OR embedding_dim = 0)
             ORDER BY received_at DESC, id ASC
             LIMIT ?2",
            EMAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id.0, limit as i64], row_to_email)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Counts non-trashed emails of an owner that still lack an embedding.
pub async fn count_missing_embeddings(db: &Database, owner_id: &OwnerId) -> Result<usize> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM emails
             WHERE owner_id = ?1 AND trashed = 0 AND (embedding IS NULL OR embedding_dim = 0)",
            [&owner_id.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    })
    .await
}

/// Returns distinct senders of an owner's non-trashed mail, capped at `limit`.
pub async fn distinct_senders(db: &Database, owner_id: &OwnerId, limit: usize) -> Result<Vec<Address>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT from_address, from_name, MAX(received_at) AS latest FROM emails
             WHERE owner_id = ?1 AND trashed = 0
             GROUP BY from_address, from_name
             ORDER BY latest DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![owner_id.0, limit as i64], |row| {
            Ok(Address {
                email: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Returns subjects of an owner's most recent non-trashed mail.
pub async fn recent_subjects(db: &Database, owner_id: &OwnerId, limit: usize) -> Result<Vec<String>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT subject FROM emails
             WHERE owner_id = ?1 AND trashed = 0
             ORDER BY received_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![owner_id.0, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

fn row_to_email(row: &Row<'_>) -> std::result::Result<Email, rusqlite::Error> {
    let received_at: String = row.get(7)?;
    let status: String = row.get(8)?;
    let deferred_until: Option<String> = row.get(9)?;
    let embedding_json: Option<String> = row.get(11)?;
    let labels_json: String = row.get(12)?;

    let embedding = embedding_json
        .map(|json| {
            serde_json::from_str::<Vec<f32>>(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    let labels: Vec<String> = serde_json::from_str(&labels_json).unwrap_or_default();

    Ok(Email {
        id: EmailId(row.get(0)?),
        owner_id: OwnerId(row.get(1)?),
        subject: row.get(2)?,
        body_text: row.get(3)?,
        preview: row.get(4)?,
        from: Address {
            email: row.get(5)?,
            name: row.get(6)?,
        },
        received_at: parse_timestamp(7, &received_at)?,
        status: EmailStatus::from_stored(&status),
        deferred_until: deferred_until
            .map(|s| parse_timestamp(9, &s))
            .transpose()?,
        summary: row.get(10)?,
        embedding,
        labels,
    })
}
