//! Business services layer.
//!
//! Services orchestrate the search and workflow engine, coordinating between
//! providers, storage, and domain types.
//!
//! # Architecture
//!
//! ```text
//!  api facade (request/response shapes)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Providers, Embeddings, Storage)
//! ```
//!
//! # Services Overview
//!
//! - [`SearchService`]: hybrid remote + local search with fuzzy fallback, and suggestions
//! - [`SemanticService`]: embedding generation and cosine-ranked search
//! - [`KanbanService`]: workflow status transitions and board reads
//! - [`ColumnService`]: per-owner board column configuration
//! - [`SnoozeScheduler`]: background restoration of elapsed snoozes
//! - [`SummaryService`]: summaries through a pluggable [`Summarizer`]
//! - [`StatsService`]: status distribution, trends and top senders

mod column_service;
mod detail_fetcher;
mod kanban_service;
mod search_service;
mod semantic_service;
mod snooze_scheduler;
mod stats_service;
mod summary_service;

#[cfg(test)]
pub(crate) mod testing;

pub use column_service::{ColumnError, ColumnService, NewColumn};
pub use detail_fetcher::DetailFetcher;
pub use kanban_service::{parse_instant, Board, KanbanError, KanbanService};
pub use search_service::{SearchError, SearchService};
pub use semantic_service::{batch_limit, search_limit, SemanticService};
pub use snooze_scheduler::{SnoozeScheduler, TickReport};
pub use stats_service::{StatsError, StatsService};
pub use summary_service::{ExtractiveSummarizer, Summarizer, SummaryError, SummaryService};
