//! Request and response shapes for the external interface.
//!
//! [`Api`] exposes one method per endpoint. [`crate::server`] mounts them on
//! an axum router, deserializing request bodies into the types here and
//! serializing the response (or [`ApiError`]) back out. Field names are
//! camelCase on the wire and timestamps are RFC 3339.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::domain::{
    Card, ColumnId, ColumnMeta, ColumnPatch, Email, EmailId, EmailStatus, EmbeddingReport,
    KanbanColumn, OwnerId, SearchResult, SearchSource, StatsPeriod, StatsReport, Suggestion,
};
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::providers::email::{ProviderError, RemoteSearch};
use crate::services::{
    ColumnError, ColumnService, KanbanError, KanbanService, NewColumn, SearchError, SearchService,
    SemanticService, StatsError, StatsService, Summarizer, SummaryError, SummaryService,
};
use crate::storage::Database;

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{status} {error}: {message}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Short machine-readable kind.
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn new(status: u16, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "not_found", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, "forbidden", message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(502, "upstream_error", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(503, "unavailable", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "internal_error", message)
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Authentication(_) => Self::new(401, "unauthorized", e.to_string()),
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for ApiError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::InvalidInput(_) => Self::bad_request(e.to_string()),
            EmbeddingError::ProviderUnavailable(_) => Self::unavailable(e.to_string()),
            EmbeddingError::DimensionMismatch { .. } => Self::internal(e.to_string()),
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidQuery(m) => Self::bad_request(m),
            SearchError::Remote(e) => e.into(),
            SearchError::Embedding(e) => e.into(),
            SearchError::Storage(e) => Self::internal(e.to_string()),
            SearchError::Cancelled => Self::new(499, "cancelled", "request cancelled"),
        }
    }
}

impl From<KanbanError> for ApiError {
    fn from(e: KanbanError) -> Self {
        match e {
            KanbanError::InvalidTransition(_) | KanbanError::InvalidTimestamp(_) => {
                Self::bad_request(e.to_string())
            }
            KanbanError::EmailNotFound(_) => Self::not_found(e.to_string()),
            KanbanError::Storage(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<ColumnError> for ApiError {
    fn from(e: ColumnError) -> Self {
        match e {
            ColumnError::NotFound(_) => Self::not_found(e.to_string()),
            ColumnError::Forbidden(_) => Self::forbidden(e.to_string()),
            ColumnError::InvalidLabel(_) | ColumnError::NoUpdates => Self::bad_request(e.to_string()),
            ColumnError::Storage(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(e: SummaryError) -> Self {
        match e {
            SummaryError::EmailNotFound(_) => Self::not_found(e.to_string()),
            SummaryError::Storage(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(e: StatsError) -> Self {
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(status = self.status, "Request failed: {}", self.message);
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Wire types
// ============================================================================

/// An email as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailView {
    pub id: EmailId,
    pub subject: String,
    pub preview: String,
    pub sender_name: String,
    pub sender_address: String,
    pub received_at: DateTime<Utc>,
    pub status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub labels: Vec<String>,
}

impl From<Email> for EmailView {
    fn from(email: Email) -> Self {
        Self {
            id: email.id,
            subject: email.subject,
            preview: email.preview,
            sender_name: email.from.name.unwrap_or_default(),
            sender_address: email.from.email,
            received_at: email.received_at,
            status: email.status,
            snoozed_until: email.deferred_until,
            summary: email.summary,
            labels: email.labels,
        }
    }
}

/// A search hit: the email plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub email: EmailView,
    pub source: SearchSource,
    pub score: f32,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        Self {
            email: result.email.into(),
            source: result.source,
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub emails: Vec<SearchHit>,
    pub next_page_token: Option<String>,
    pub total_estimate: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEmail {
    pub email: EmailView,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticResponse {
    pub results: Vec<ScoredEmail>,
    pub query: String,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateEmbeddingsRequest {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub email_id: String,
    pub to_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeRequest {
    pub email_id: String,
    pub until: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub email_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub ok: bool,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardResponse {
    pub columns: BTreeMap<String, Vec<Card>>,
}

/// A board column as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub id: ColumnId,
    pub key: String,
    pub label: String,
    pub order: i64,
    pub gmail_label: Option<String>,
    pub color: Option<String>,
    pub is_default: bool,
}

impl From<KanbanColumn> for ColumnView {
    fn from(column: KanbanColumn) -> Self {
        Self {
            id: column.id,
            key: column.key,
            label: column.label,
            order: column.order,
            gmail_label: column.external_label,
            color: column.color,
            is_default: column.is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnsResponse {
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnRequest {
    pub label: String,
    #[serde(default)]
    pub gmail_label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColumnRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub gmail_label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub column_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsQuery {
    /// `7d`, `30d` or `90d`; anything else means `30d`.
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStat {
    pub status: EmailStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendStat {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStat {
    pub name: String,
    pub email: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStat {
    pub day_of_week: u32,
    pub hour: u32,
    pub count: usize,
}

/// Dashboard statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub status_stats: Vec<StatusStat>,
    pub email_trend: Vec<TrendStat>,
    pub top_senders: Vec<SenderStat>,
    pub daily_activity: Vec<ActivityStat>,
    pub total_emails: usize,
    pub unread_count: usize,
    pub starred_count: usize,
    pub period: StatsPeriod,
}

impl From<StatsReport> for StatisticsResponse {
    fn from(report: StatsReport) -> Self {
        Self {
            status_stats: report
                .status_counts
                .into_iter()
                .map(|s| StatusStat {
                    status: s.status,
                    count: s.count,
                })
                .collect(),
            email_trend: report
                .trend
                .into_iter()
                .map(|p| TrendStat {
                    date: p.date.format("%Y-%m-%d").to_string(),
                    count: p.count,
                })
                .collect(),
            top_senders: report
                .top_senders
                .into_iter()
                .map(|s| SenderStat {
                    name: s.name.unwrap_or_default(),
                    email: s.email,
                    count: s.count,
                })
                .collect(),
            daily_activity: report
                .activity
                .into_iter()
                .map(|c| ActivityStat {
                    day_of_week: c.day_of_week,
                    hour: c.hour,
                    count: c.count,
                })
                .collect(),
            total_emails: report.totals.total,
            unread_count: report.totals.unread,
            starred_count: report.totals.starred,
            period: report.period,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn email_id(raw: &str) -> ApiResult<EmailId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("emailId is required"));
    }
    Ok(EmailId::from(raw))
}

/// Endpoint handlers over the engine's services.
#[derive(Clone)]
pub struct Api {
    search: Arc<SearchService>,
    semantic: Arc<SemanticService>,
    kanban: KanbanService,
    columns: ColumnService,
    summaries: Arc<SummaryService>,
    stats: StatsService,
}

impl Api {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteSearch>,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn Summarizer>,
        settings: &Settings,
    ) -> Self {
        Self {
            search: Arc::new(SearchService::new(db.clone(), remote, settings.search.clone())),
            semantic: Arc::new(SemanticService::new(db.clone(), embedder)),
            kanban: KanbanService::new(db.clone()),
            columns: ColumnService::new(db.clone(), settings.kanban.clone()),
            summaries: Arc::new(SummaryService::new(db.clone(), summarizer)),
            stats: StatsService::new(db),
        }
    }

    /// The underlying search service, e.g. to flush cache-warm writes on shutdown.
    pub fn search_service(&self) -> &SearchService {
        &self.search
    }

    /// `GET search?q=&pageToken=`
    pub async fn search(
        &self,
        owner_id: &OwnerId,
        query: SearchQuery,
        cancel: &CancellationToken,
    ) -> ApiResult<SearchResponse> {
        let page = self
            .search
            .hybrid_search(owner_id, &query.q, query.page_token.as_deref(), cancel)
            .await?;
        Ok(SearchResponse {
            emails: page.results.into_iter().map(SearchHit::from).collect(),
            next_page_token: page.next_page_token,
            total_estimate: page.total_estimate,
        })
    }

    /// `POST search/semantic`
    pub async fn semantic_search(&self, owner_id: &OwnerId, request: SemanticRequest) -> ApiResult<SemanticResponse> {
        let results = self
            .semantic
            .semantic_search(owner_id, &request.query, request.limit.unwrap_or(0))
            .await?;
        let results: Vec<ScoredEmail> = results
            .into_iter()
            .map(|r| ScoredEmail {
                email: r.email.into(),
                score: r.score,
            })
            .collect();
        Ok(SemanticResponse {
            total: results.len(),
            results,
            query: request.query,
        })
    }

    /// `GET search/suggestions?q=`
    pub async fn suggestions(&self, owner_id: &OwnerId, prefix: &str) -> ApiResult<SuggestionsResponse> {
        let suggestions = self.search.suggestions(owner_id, prefix).await?;
        Ok(SuggestionsResponse { suggestions })
    }

    /// `POST search/generate-embeddings`
    pub async fn generate_embeddings(
        &self,
        owner_id: &OwnerId,
        request: GenerateEmbeddingsRequest,
    ) -> ApiResult<EmbeddingReport> {
        Ok(self
            .semantic
            .generate_embeddings(owner_id, request.limit.unwrap_or(0))
            .await?)
    }

    /// `POST kanban/move`
    pub async fn move_email(&self, owner_id: &OwnerId, request: MoveRequest) -> ApiResult<OkResponse> {
        let id = email_id(&request.email_id)?;
        self.kanban.move_email(owner_id, &id, &request.to_status).await?;
        Ok(OkResponse::ok())
    }

    /// `POST kanban/snooze`
    pub async fn snooze(&self, owner_id: &OwnerId, request: SnoozeRequest) -> ApiResult<OkResponse> {
        let id = email_id(&request.email_id)?;
        self.kanban.snooze(owner_id, &id, &request.until).await?;
        Ok(OkResponse::ok())
    }

    /// `GET kanban`
    pub async fn board(&self, owner_id: &OwnerId) -> ApiResult<BoardResponse> {
        let board = self.kanban.board(owner_id).await?;
        Ok(BoardResponse {
            columns: board.columns,
        })
    }

    /// `GET kanban/meta`
    pub fn column_meta(&self) -> Vec<ColumnMeta> {
        self.columns.meta()
    }

    /// `POST kanban/summarize`
    pub async fn summarize(&self, owner_id: &OwnerId, request: SummarizeRequest) -> ApiResult<SummaryResponse> {
        let id = email_id(&request.email_id)?;
        let summary = self.summaries.summarize_and_save(owner_id, &id).await?;
        Ok(SummaryResponse { ok: true, summary })
    }

    /// `GET kanban/columns`
    pub async fn list_columns(&self, owner_id: &OwnerId) -> ApiResult<ColumnsResponse> {
        let columns = self.columns.list(owner_id).await?;
        Ok(ColumnsResponse {
            columns: columns.into_iter().map(ColumnView::from).collect(),
        })
    }

    /// `POST kanban/columns`
    pub async fn create_column(&self, owner_id: &OwnerId, request: CreateColumnRequest) -> ApiResult<ColumnView> {
        let column = self
            .columns
            .create(
                owner_id,
                NewColumn {
                    label: request.label,
                    external_label: request.gmail_label,
                    color: request.color,
                },
            )
            .await?;
        Ok(column.into())
    }

    /// `PUT kanban/columns/{id}`
    pub async fn update_column(
        &self,
        owner_id: &OwnerId,
        id: &str,
        request: UpdateColumnRequest,
    ) -> ApiResult<ColumnView> {
        let patch = ColumnPatch {
            label: request.label,
            external_label: request.gmail_label,
            color: request.color,
            order: request.order,
        };
        let column = self.columns.update(owner_id, &ColumnId::from(id), patch).await?;
        Ok(column.into())
    }

    /// `DELETE kanban/columns/{id}`
    pub async fn delete_column(&self, owner_id: &OwnerId, id: &str) -> ApiResult<OkResponse> {
        self.columns.delete(owner_id, &ColumnId::from(id)).await?;
        Ok(OkResponse::ok())
    }

    /// `POST kanban/columns/reorder`
    pub async fn reorder_columns(&self, owner_id: &OwnerId, request: ReorderRequest) -> ApiResult<OkResponse> {
        let ids = request.column_ids.into_iter().map(ColumnId::from).collect();
        self.columns.reorder(owner_id, ids).await?;
        Ok(OkResponse::ok())
    }

    /// `GET statistics?period=`
    pub async fn statistics(&self, owner_id: &OwnerId, query: StatsQuery) -> ApiResult<StatisticsResponse> {
        let period = StatsPeriod::parse(query.period.as_deref());
        let report = self.stats.report(owner_id, period).await?;
        Ok(report.into())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::services::testing::{at, FakeEmbedder, FakeRemote};
    use crate::services::ExtractiveSummarizer;
    use crate::storage::queries::emails;

    async fn api() -> (Database, Arc<FakeRemote>, Api) {
        let db = Database::open_in_memory().await.unwrap();
        let remote = Arc::new(FakeRemote::new());
        let api = Api::new(
            db.clone(),
            remote.clone(),
            Arc::new(FakeEmbedder::new(2).with_vector("invoice", vec![1.0, 0.0])),
            Arc::new(ExtractiveSummarizer::default()),
            &Settings::default(),
        );
        (db, remote, api)
    }

    fn owner() -> OwnerId {
        OwnerId::from("u1")
    }

    #[test]
    fn request_bodies_use_camel_case() {
        let request: MoveRequest =
            serde_json::from_value(json!({"emailId": "m1", "toStatus": "in_progress"})).unwrap();
        assert_eq!(request.email_id, "m1");
        assert_eq!(request.to_status, "in_progress");

        let query: SearchQuery = serde_json::from_value(json!({"q": "x"})).unwrap();
        assert_eq!(query.page_token, None);
    }

    #[test]
    fn error_statuses() {
        assert_eq!(ApiError::from(SearchError::InvalidQuery("x".into())).status, 400);
        assert_eq!(
            ApiError::from(SearchError::Remote(ProviderError::Connection("x".into()))).status,
            502
        );
        assert_eq!(ApiError::from(KanbanError::InvalidTimestamp("x".into())).status, 400);
        assert_eq!(ApiError::from(KanbanError::EmailNotFound("m1".into())).status, 404);
        assert_eq!(ApiError::from(ColumnError::Forbidden("x".into())).status, 403);
        assert_eq!(ApiError::from(ColumnError::NoUpdates).status, 400);
        assert_eq!(ApiError::from(SearchError::Cancelled).status, 499);
        assert_eq!(
            ApiError::from(EmbeddingError::Upstream {
                status: Some(500),
                message: "x".into()
            })
            .status,
            502
        );
    }

    #[tokio::test]
    async fn search_response_shape() {
        let (_db, remote, api) = api().await;
        remote.add_detail("m1", "Invoice due");
        remote.set_page(&["m1"], Some("p2"), 12);

        let response = api
            .search(
                &owner(),
                SearchQuery {
                    q: "invoice".to_string(),
                    page_token: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["nextPageToken"], json!("p2"));
        assert_eq!(value["totalEstimate"], json!(12));
        assert_eq!(value["emails"][0]["id"], json!("m1"));
        assert_eq!(value["emails"][0]["source"], json!("remote"));
        assert_eq!(value["emails"][0]["status"], json!("inbox"));
        api.search_service().flush_background().await;
    }

    #[tokio::test]
    async fn empty_search_is_bad_request() {
        let (_db, _remote, api) = api().await;
        let err = api
            .search(&owner(), SearchQuery::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn kanban_round_trip() {
        let (db, _remote, api) = api().await;
        emails::upsert(&db, &Email::new("m1", "u1", at(1, 0)).with_subject("Plan"))
            .await
            .unwrap();

        let err = api
            .snooze(
                &owner(),
                SnoozeRequest {
                    email_id: "m1".to_string(),
                    until: "tomorrow".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        api.snooze(
            &owner(),
            SnoozeRequest {
                email_id: "m1".to_string(),
                until: "2099-01-01T00:00:00Z".to_string(),
            },
        )
        .await
        .unwrap();

        let board = serde_json::to_value(api.board(&owner()).await.unwrap()).unwrap();
        assert_eq!(board["columns"]["snoozed"][0]["id"], json!("m1"));
        assert_eq!(
            board["columns"]["snoozed"][0]["snoozedUntil"],
            json!("2099-01-01T00:00:00Z")
        );

        let ok = api
            .move_email(
                &owner(),
                MoveRequest {
                    email_id: "m1".to_string(),
                    to_status: "todo".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(ok.ok);

        let err = api
            .move_email(
                &owner(),
                MoveRequest {
                    email_id: " ".to_string(),
                    to_status: "todo".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn column_endpoints() {
        let (_db, _remote, api) = api().await;

        let listed = api.list_columns(&owner()).await.unwrap();
        assert_eq!(listed.columns.len(), 5);
        assert_eq!(listed.columns[0].gmail_label.as_deref(), Some("INBOX"));

        let err = api
            .delete_column(&owner(), &listed.columns[0].id.0)
            .await
            .unwrap_err();
        assert_eq!(err.status, 403);

        let created = api
            .create_column(
                &owner(),
                CreateColumnRequest {
                    label: "Waiting".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.key, "custom_waiting");

        let err = api
            .update_column(&owner(), &created.id.0, UpdateColumnRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        let err = api.delete_column(&owner(), "missing").await.unwrap_err();
        assert_eq!(err.status, 404);

        let meta = api.column_meta();
        assert_eq!(meta[1].key, "todo");
        assert_eq!(meta[1].label, "To Do");
    }

    #[tokio::test]
    async fn semantic_and_embeddings() {
        let (db, _remote, api) = api().await;
        emails::upsert(&db, &Email::new("m1", "u1", at(1, 0)).with_subject("Invoice"))
            .await
            .unwrap();

        let report = api
            .generate_embeddings(&owner(), GenerateEmbeddingsRequest::default())
            .await
            .unwrap();
        assert_eq!(report.processed, 1);

        let response = api
            .semantic_search(
                &owner(),
                SemanticRequest {
                    query: "invoice".to_string(),
                    limit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.query, "invoice");
        assert_eq!(response.results[0].email.id.0, "m1");
    }

    #[tokio::test]
    async fn statistics_shape() {
        let (db, _remote, api) = api().await;
        let recent = Utc::now() - chrono::Duration::days(2);
        emails::upsert(
            &db,
            &Email::new("m1", "u1", recent)
                .with_from(crate::domain::Address::with_name("ann@example.com", "Ann"))
                .with_labels(["UNREAD"]),
        )
        .await
        .unwrap();

        let response = api
            .statistics(
                &owner(),
                StatsQuery {
                    period: Some("7d".to_string()),
                },
            )
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["period"], json!("7d"));
        assert_eq!(value["statusStats"][0], json!({"status": "inbox", "count": 1}));
        assert_eq!(
            value["emailTrend"][0]["date"],
            json!(recent.format("%Y-%m-%d").to_string())
        );
        assert_eq!(value["topSenders"][0]["name"], json!("Ann"));
        assert_eq!(value["dailyActivity"][0]["count"], json!(1));
        assert_eq!(value["totalEmails"], json!(1));
        assert_eq!(value["unreadCount"], json!(1));
        assert_eq!(value["starredCount"], json!(0));

        let fallback = api
            .statistics(
                &owner(),
                StatsQuery {
                    period: Some("1y".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(fallback.period, StatsPeriod::Month);
    }

    #[tokio::test]
    async fn summarize_endpoint() {
        let (db, _remote, api) = api().await;
        emails::upsert(
            &db,
            &Email::new("m1", "u1", at(1, 0)).with_body("Contract renewal is due. Sign by Monday."),
        )
        .await
        .unwrap();

        let response = api
            .summarize(
                &owner(),
                SummarizeRequest {
                    email_id: "m1".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(response.ok);
        assert!(response.summary.contains("Contract renewal"));

        let err = api
            .summarize(
                &owner(),
                SummarizeRequest {
                    email_id: "m9".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }
}
