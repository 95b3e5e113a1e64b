//! Domain layer types for the mailboard engine.
//!
//! This module contains the core domain types used throughout the crate:
//! emails and their workflow status, search results, Kanban columns and
//! mailbox statistics.

mod email;
mod kanban;
mod label;
mod search;
mod stats;
mod types;

pub use email::{Address, Email, EmailStatus, UnknownStatus};
pub use kanban::{
    canonical_column_key, custom_column_key, Card, ColumnMeta, ColumnPatch, KanbanColumn,
};
pub use label::system_labels;
pub use search::{
    EmbeddingReport, SearchPage, SearchResult, SearchSource, Suggestion, SuggestionKind,
};
pub use stats::{
    ActivityCell, MailboxTotals, StatsPeriod, StatsReport, StatusCount, TopSender, TrendPoint,
};
pub use types::{ColumnId, EmailId, OwnerId};
