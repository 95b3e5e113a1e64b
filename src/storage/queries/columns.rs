//! Kanban column queries.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::domain::{ColumnId, ColumnPatch, KanbanColumn, OwnerId};
use crate::storage::database::{format_timestamp, Database, Result};

const COLUMN_FIELDS: &str = "id, owner_id, key, label, sort_order, external_label, color, is_default";

/// Inserts the default columns if the owner has none. Returns true if seeded.
pub async fn seed_defaults(db: &Database, owner_id: &OwnerId) -> Result<bool> {
    let owner_id = owner_id.clone();

    db.transaction(move |tx| {
        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM kanban_columns WHERE owner_id = ?1",
            [&owner_id.0],
            |row| row.get(0),
        )?;
        if count > 0 {
            return Ok(false);
        }

        for column in KanbanColumn::defaults(&owner_id) {
            insert_row(tx, &column)?;
        }
        Ok(true)
    })
    .await
}

/// Inserts a column.
pub async fn insert(db: &Database, column: &KanbanColumn) -> Result<()> {
    let column = column.clone();
    db.with_conn(move |conn| {
        insert_row(conn, &column)?;
        Ok(())
    })
    .await
}

/// Lists an owner's columns by ascending order.
pub async fn list(db: &Database, owner_id: &OwnerId) -> Result<Vec<KanbanColumn>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM kanban_columns WHERE owner_id = ?1 ORDER BY sort_order ASC, created_at ASC",
            COLUMN_FIELDS
        );
        let mut stmt = conn.prepare(&sql)?;
        let columns = stmt.query_map([&owner_id.0], row_to_column)?;
        Ok(columns.collect::<std::result::Result<Vec<_>, _>>()?)
    })
    .await
}

/// Gets a column by id within an owner's partition.
pub async fn get(db: &Database, owner_id: &OwnerId, id: &ColumnId) -> Result<Option<KanbanColumn>> {
    let owner_id = owner_id.clone();
    let id = id.clone();

    db.with_conn(move |conn| {
        let sql = format!(
            "SELECT {} FROM kanban_columns WHERE id = ?1 AND owner_id = ?2",
            COLUMN_FIELDS
        );
        let column = conn
            .query_row(&sql, params![id.0, owner_id.0], row_to_column)
            .optional()?;
        Ok(column)
    })
    .await
}

/// Returns the highest order in use, or `None` for an empty board.
pub async fn max_order(db: &Database, owner_id: &OwnerId) -> Result<Option<i64>> {
    let owner_id = owner_id.clone();

    db.with_conn(move |conn| {
        let max = conn.query_row(
            "SELECT MAX(sort_order) FROM kanban_columns WHERE owner_id = ?1",
            [&owner_id.0],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    })
    .await
}

/// Applies a patch. Fields left `None` keep their stored value.
///
/// Returns false if the column does not belong to the owner.
pub async fn update(
    db: &Database,
    owner_id: &OwnerId,
    id: &ColumnId,
    patch: ColumnPatch,
) -> Result<bool> {
    let owner_id = owner_id.clone();
    let id = id.clone();

    db.with_conn(move |conn| {
        let changed = conn.execute(
            "UPDATE kanban_columns SET
                label = COALESCE(?1, label),
                external_label = COALESCE(?2, external_label),
                color = COALESCE(?3, color),
                sort_order = COALESCE(?4, sort_order)
             WHERE id = ?5 AND owner_id = ?6",
            params![
                patch.label,
                patch.external_label,
                patch.color,
                patch.order,
                id.0,
                owner_id.0
            ],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Deletes a column. Returns false if nothing was removed.
pub async fn delete(db: &Database, owner_id: &OwnerId, id: &ColumnId) -> Result<bool> {
    let owner_id = owner_id.clone();
    let id = id.clone();

    db.with_conn(move |conn| {
        let changed = conn.execute(
            "DELETE FROM kanban_columns WHERE id = ?1 AND owner_id = ?2",
            params![id.0, owner_id.0],
        )?;
        Ok(changed > 0)
    })
    .await
}

/// Sets each listed column's order to its position. Unknown ids are skipped.
pub async fn reorder(db: &Database, owner_id: &OwnerId, ids: Vec<ColumnId>) -> Result<usize> {
    let owner_id = owner_id.clone();

    db.transaction(move |tx| {
        let mut stmt =
            tx.prepare("UPDATE kanban_columns SET sort_order = ?1 WHERE id = ?2 AND owner_id = ?3")?;
        let mut updated = 0;
        for (position, id) in ids.iter().enumerate() {
            updated += stmt.execute(params![position as i64, id.0, owner_id.0])?;
        }
        Ok(updated)
    })
    .await
}

fn insert_row(conn: &rusqlite::Connection, column: &KanbanColumn) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO kanban_columns
            (id, owner_id, key, label, sort_order, external_label, color, is_default, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            column.id.0,
            column.owner_id.0,
            column.key,
            column.label,
            column.order,
            column.external_label,
            column.color,
            column.is_default as i32,
            format_timestamp(&Utc::now()),
        ],
    )
}

fn row_to_column(row: &Row<'_>) -> rusqlite::Result<KanbanColumn> {
    Ok(KanbanColumn {
        id: ColumnId::from(row.get::<_, String>(0)?),
        owner_id: OwnerId::from(row.get::<_, String>(1)?),
        key: row.get(2)?,
        label: row.get(3)?,
        order: row.get(4)?,
        external_label: row.get(5)?,
        color: row.get(6)?,
        is_default: row.get::<_, i32>(7)? != 0,
    })
}
