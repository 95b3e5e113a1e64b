//! Per-owner Kanban column configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::KanbanSettings;
use crate::domain::{custom_column_key, ColumnId, ColumnMeta, ColumnPatch, KanbanColumn, OwnerId};
use crate::storage::queries::columns;
use crate::storage::{Database, DatabaseError};

/// Errors that can occur during column operations.
#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("Column not found: {0}")]
    NotFound(ColumnId),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("No fields to update")]
    NoUpdates,

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for column operations.
pub type Result<T> = std::result::Result<T, ColumnError>;

/// Fields for a user-created column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewColumn {
    pub label: String,
    pub external_label: Option<String>,
    pub color: Option<String>,
}

/// Manages the columns shown on an owner's board.
#[derive(Clone)]
pub struct ColumnService {
    db: Database,
    settings: KanbanSettings,
}

impl ColumnService {
    pub fn new(db: Database, settings: KanbanSettings) -> Self {
        Self { db, settings }
    }

    /// Seeds the default columns once. Returns true if they were created now.
    pub async fn init_defaults(&self, owner_id: &OwnerId) -> Result<bool> {
        let seeded = columns::seed_defaults(&self.db, owner_id).await?;
        if seeded {
            tracing::info!(owner_id = %owner_id, "Seeded default kanban columns");
        }
        Ok(seeded)
    }

    /// Lists columns in board order, seeding defaults for a new owner.
    pub async fn list(&self, owner_id: &OwnerId) -> Result<Vec<KanbanColumn>> {
        self.init_defaults(owner_id).await?;
        Ok(columns::list(&self.db, owner_id).await?)
    }

    pub async fn create(&self, owner_id: &OwnerId, new: NewColumn) -> Result<KanbanColumn> {
        let label = new.label.trim();
        if label.is_empty() {
            return Err(ColumnError::InvalidLabel("label must not be empty".to_string()));
        }

        let order = columns::max_order(&self.db, owner_id)
            .await?
            .map_or(0, |max| max + 1);

        let column = KanbanColumn {
            id: ColumnId::generate(),
            owner_id: owner_id.clone(),
            key: custom_column_key(label),
            label: label.to_string(),
            order,
            external_label: new.external_label.filter(|l| !l.trim().is_empty()),
            color: new.color.filter(|c| !c.trim().is_empty()),
            is_default: false,
        };
        columns::insert(&self.db, &column).await?;
        Ok(column)
    }

    pub async fn update(&self, owner_id: &OwnerId, id: &ColumnId, mut patch: ColumnPatch) -> Result<KanbanColumn> {
        if patch.is_empty() {
            return Err(ColumnError::NoUpdates);
        }
        if let Some(label) = patch.label.as_mut() {
            let trimmed = label.trim();
            if trimmed.is_empty() {
                return Err(ColumnError::InvalidLabel("label must not be empty".to_string()));
            }
            *label = trimmed.to_string();
        }

        if !columns::update(&self.db, owner_id, id, patch).await? {
            return Err(ColumnError::NotFound(id.clone()));
        }
        columns::get(&self.db, owner_id, id)
            .await?
            .ok_or_else(|| ColumnError::NotFound(id.clone()))
    }

    /// Deletes a user-created column. Default columns are forbidden.
    pub async fn delete(&self, owner_id: &OwnerId, id: &ColumnId) -> Result<()> {
        let column = columns::get(&self.db, owner_id, id)
            .await?
            .ok_or_else(|| ColumnError::NotFound(id.clone()))?;
        if column.is_default {
            return Err(ColumnError::Forbidden(format!(
                "default column {:?} cannot be deleted",
                column.key
            )));
        }
        if !columns::delete(&self.db, owner_id, id).await? {
            return Err(ColumnError::NotFound(id.clone()));
        }
        Ok(())
    }

    /// Sets each column's order to its position in `ids`.
    pub async fn reorder(&self, owner_id: &OwnerId, ids: Vec<ColumnId>) -> Result<usize> {
        Ok(columns::reorder(&self.db, owner_id, ids).await?)
    }

    /// Ordered column keys and labels from configuration.
    pub fn meta(&self) -> Vec<ColumnMeta> {
        self.settings.column_meta()
    }
}
