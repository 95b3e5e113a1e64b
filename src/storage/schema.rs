//! Database schema definitions.
//!
//! Timestamps are stored as fixed-width RFC3339 UTC text so lexical order
//! matches chronological order. Labels and embeddings are JSON text.

/// SQL to create the emails table.
///
/// The CHECK constraint holds the snooze invariant: `deferred_until` is set
/// exactly when the status is `snoozed`.
pub const CREATE_EMAILS: &str = r#"
CREATE TABLE IF NOT EXISTS emails (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    body_text TEXT NOT NULL DEFAULT '',
    preview TEXT NOT NULL DEFAULT '',
    from_address TEXT NOT NULL DEFAULT '',
    from_name TEXT,
    received_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'inbox',
    deferred_until TEXT,
    summary TEXT,
    embedding TEXT,
    embedding_dim INTEGER,
    labels TEXT NOT NULL DEFAULT '[]',
    trashed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((status = 'snoozed') = (deferred_until IS NOT NULL))
)
"#;

/// SQL to create the emails owner/date index.
pub const CREATE_EMAILS_OWNER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_emails_owner_received ON emails(owner_id, received_at DESC)
"#;

/// SQL to create the snooze due-date index.
pub const CREATE_EMAILS_SNOOZE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_emails_status_deferred ON emails(status, deferred_until)
"#;

/// SQL to create the kanban_columns table.
pub const CREATE_KANBAN_COLUMNS: &str = r#"
CREATE TABLE IF NOT EXISTS kanban_columns (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    key TEXT NOT NULL,
    label TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    external_label TEXT,
    color TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the kanban_columns owner/order index.
pub const CREATE_KANBAN_COLUMNS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_kanban_columns_owner_order ON kanban_columns(owner_id, sort_order)
"#;

/// Returns all schema creation statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_EMAILS,
        CREATE_EMAILS_OWNER_INDEX,
        CREATE_EMAILS_SNOOZE_INDEX,
        CREATE_KANBAN_COLUMNS,
        CREATE_KANBAN_COLUMNS_INDEX,
    ]
}
