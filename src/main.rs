//! mailboard - Entry point for the search and workflow engine

use std::sync::Arc;

use anyhow::Context;
use mailboard::domain::OwnerId;
use mailboard::providers::email::GmailSearch;
use mailboard::server::{self, AppState};
use mailboard::services::{ColumnService, ExtractiveSummarizer, SnoozeScheduler};
use mailboard::storage::Database;
use mailboard::{embedding, Api, Settings};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mailboard");

    let settings = Settings::from_env();

    let db = Database::open(&settings.storage.db_path)
        .await
        .with_context(|| format!("opening database {}", settings.storage.db_path.display()))?;

    let mut gmail = GmailSearch::new(
        OwnerId::from(settings.gmail.owner_id.as_str()),
        settings.gmail.access_token.clone(),
    )
    .with_page_size(settings.search.page_size);
    if let Some(base_url) = &settings.gmail.base_url {
        gmail = gmail.with_base_url(base_url.clone());
    }
    if settings.gmail.access_token.is_empty() {
        tracing::warn!("GMAIL_ACCESS_TOKEN not set; remote search will fail");
    }

    let embedder = embedding::from_settings(&settings.embedding);
    if settings.embedding.api_key.is_empty() {
        tracing::warn!(provider = embedder.name(), "Embedding API key not set; semantic search disabled");
    }

    let api = Api::new(
        db.clone(),
        Arc::new(gmail),
        embedder,
        Arc::new(ExtractiveSummarizer::default()),
        &settings,
    );
    let owner = OwnerId::from(settings.gmail.owner_id.as_str());
    ColumnService::new(db.clone(), settings.kanban.clone())
        .init_defaults(&owner)
        .await
        .context("seeding default columns")?;

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("binding {addr}"))?;

    let shutdown = CancellationToken::new();
    let scheduler = Arc::new(SnoozeScheduler::new(db, settings.snooze.interval()));
    let handle = scheduler.spawn(shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down");
        signal.cancel();
    });

    let state = AppState::new(api.clone(), owner, shutdown.clone());
    let served = server::serve(listener, server::router(state), shutdown.clone()).await;

    shutdown.cancel();
    handle.await.context("snooze scheduler panicked")?;
    api.search_service().flush_background().await;

    served.context("serving HTTP")?;
    Ok(())
}
