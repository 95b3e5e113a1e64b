//! Configuration and settings management.
//!
//! Settings have compiled-in defaults and are overlaid from the environment.

mod settings;

pub use settings::{
    parse_interval, EmbeddingProviderKind, EmbeddingSettings, GmailSettings, KanbanSettings,
    SearchSettings, ServerSettings, Settings, SnoozeSettings, StorageSettings,
};
