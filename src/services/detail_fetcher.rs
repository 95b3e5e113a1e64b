//! Bounded-parallel enrichment of remote search stubs.

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::domain::Email;
use crate::providers::email::{RemoteSearch, SearchStub};

/// Fetches full records for search stubs with at most `concurrency` calls in flight.
///
/// Fetches run on the caller's task; nothing is spawned. Dropping the
/// enrichment future, or cancelling its token, aborts every in-flight call.
#[derive(Debug, Clone, Copy)]
pub struct DetailFetcher {
    concurrency: usize,
}

impl DetailFetcher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Enriches stubs, dropping any that fail to fetch.
    ///
    /// Output order is unspecified. Returns `None` if `cancel` fires first.
    pub async fn enrich(
        &self,
        remote: &dyn RemoteSearch,
        stubs: &[SearchStub],
        cancel: &CancellationToken,
    ) -> Option<Vec<Email>> {
        if stubs.is_empty() {
            return Some(Vec::new());
        }

        let semaphore = Semaphore::new(self.concurrency);

        let mut pending: FuturesUnordered<_> = stubs
            .iter()
            .map(|stub| {
                let semaphore = &semaphore;
                async move {
                    // The semaphore is never closed, so a permit always arrives.
                    let _permit = semaphore.acquire().await;
                    remote
                        .fetch_detail(&stub.id)
                        .await
                        .map_err(|e| (stub.id.clone(), e))
                }
            })
            .collect();

        let collect = async {
            let mut emails = Vec::with_capacity(stubs.len());
            while let Some(result) = pending.next().await {
                match result {
                    Ok(email) => emails.push(email),
                    Err((id, e)) => {
                        tracing::debug!(email_id = %id, error = %e, "dropping failed detail fetch");
                    }
                }
            }
            emails
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            emails = collect => Some(emails),
        }
    }
}
