//! Engine settings and configuration types.
//!
//! Defaults are compiled in; [`Settings::from_env`] overlays values from the
//! process environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::canonical_column_key;
use crate::domain::ColumnMeta;

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Local cache location.
    pub storage: StorageSettings,
    /// Hybrid search tuning.
    pub search: SearchSettings,
    /// Embedding provider configuration.
    pub embedding: EmbeddingSettings,
    /// Background snooze restoration.
    pub snooze: SnoozeSettings,
    /// Kanban board layout.
    pub kanban: KanbanSettings,
    /// Remote mail provider credentials.
    pub gmail: GmailSettings,
    /// HTTP listener.
    pub server: ServerSettings,
}

impl Settings {
    /// Builds settings from defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from defaults overlaid with values from `lookup`.
    ///
    /// Blank values are ignored. An unparsable snooze interval keeps the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(path) = get("MAILBOARD_DB_PATH") {
            settings.storage.db_path = PathBuf::from(path);
        }

        if let Some(provider) = get("EMBEDDING_PROVIDER") {
            match provider.trim().to_lowercase().as_str() {
                "gemini" => settings.embedding.provider = EmbeddingProviderKind::Gemini,
                "openai" => settings.embedding.provider = EmbeddingProviderKind::OpenAi,
                other => tracing::warn!(provider = other, "unknown embedding provider, using openai"),
            }
        }
        if let Some(key) = get("EMBEDDING_API_KEY") {
            settings.embedding.api_key = key;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            settings.embedding.model = model;
        }

        if let Some(raw) = get("SNOOZE_CHECK_INTERVAL") {
            match parse_interval(&raw) {
                Some(interval) => settings.snooze.interval_secs = interval.as_secs(),
                None => tracing::warn!(value = %raw, "invalid SNOOZE_CHECK_INTERVAL, using default"),
            }
        }

        if let Some(columns) = get("KANBAN_COLUMNS") {
            let labels: Vec<String> = columns
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !labels.is_empty() {
                settings.kanban.columns = labels;
            }
        }

        if let Some(token) = get("GMAIL_ACCESS_TOKEN") {
            settings.gmail.access_token = token;
        }
        if let Some(owner) = get("MAILBOARD_OWNER") {
            settings.gmail.owner_id = owner.trim().to_string();
        }

        if let Some(host) = get("MAILBOARD_HOST") {
            settings.server.host = host.trim().to_string();
        }
        if let Some(raw) = get("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => settings.server.port = port,
                Err(_) => tracing::warn!(value = %raw, "invalid PORT, using default"),
            }
        }

        settings
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file.
    pub db_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let db_path = ProjectDirs::from("dev", "mailboard", "mailboard")
            .map(|dirs| dirs.data_dir().join("mailboard.db"))
            .unwrap_or_else(|| PathBuf::from("mailboard.db"));
        Self { db_path }
    }
}

/// Hybrid search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Maximum edit distance accepted by the fuzzy fallback.
    pub fuzzy_threshold: usize,
    /// Queries of at most this many chars never trigger the fuzzy fallback.
    pub min_fuzzy_query_len: usize,
    /// Cap on local search results.
    pub local_limit: usize,
    /// Maximum concurrent detail fetches per search.
    pub detail_concurrency: usize,
    /// Time budget for the background cache-warm write, in seconds.
    pub cache_warm_timeout_secs: u64,
    /// Stubs requested per remote search call.
    pub page_size: u32,
    /// Characters of context kept on each side of a snippet match.
    pub snippet_context: usize,
}

impl SearchSettings {
    pub fn cache_warm_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_warm_timeout_secs)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 3,
            min_fuzzy_query_len: 3,
            local_limit: 50,
            detail_concurrency: 10,
            cache_warm_timeout_secs: 60,
            page_size: 25,
            snippet_context: 60,
        }
    }
}

/// Embedding provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    OpenAi,
    Gemini,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    /// Empty when embeddings are not configured.
    pub api_key: String,
    /// Model identifier; empty selects the provider default.
    pub model: String,
    /// Custom API endpoint.
    pub base_url: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAi,
            api_key: String::new(),
            model: String::new(),
            base_url: None,
        }
    }
}

/// Snooze scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnoozeSettings {
    /// Seconds between due-snooze checks.
    pub interval_secs: u64,
}

impl SnoozeSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SnoozeSettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Kanban board layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanSettings {
    /// Column labels in display order.
    pub columns: Vec<String>,
}

impl KanbanSettings {
    /// Returns the ordered column metadata for the configured labels.
    pub fn column_meta(&self) -> Vec<ColumnMeta> {
        self.columns
            .iter()
            .map(|label| ColumnMeta {
                key: canonical_column_key(label),
                label: label.trim().to_string(),
            })
            .collect()
    }
}

impl Default for KanbanSettings {
    fn default() -> Self {
        Self {
            columns: ["Inbox", "To Do", "In Progress", "Done", "Snoozed"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Remote mail provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailSettings {
    /// Owner partition the token's mailbox is stored under.
    pub owner_id: String,
    /// OAuth bearer token; empty disables remote search.
    pub access_token: String,
    /// Custom API endpoint.
    pub base_url: Option<String>,
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            owner_id: "me".to_string(),
            access_token: String::new(),
            base_url: None,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses an interval like `30s`, `1m`, `2h` or bare seconds.
pub fn parse_interval(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last()? {
        (i, 's') => (&value[..i], 1),
        (i, 'm') => (&value[..i], 60),
        (i, 'h') => (&value[..i], 3600),
        _ => (value, 1),
    };

    let n: u64 = digits.trim().parse().ok()?;
    if n == 0 {
        return None;
    }
    n.checked_mul(multiplier).map(Duration::from_secs)
}
