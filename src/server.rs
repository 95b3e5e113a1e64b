//! HTTP server exposing the [`Api`] under `/api`.
//!
//! Authentication happens upstream: the caller's identity arrives in the
//! `x-owner-id` header, and requests without it act on the configured
//! default owner.

use std::future::Future;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{
    ApiResult, BoardResponse, ColumnView, ColumnsResponse, CreateColumnRequest,
    GenerateEmbeddingsRequest, MoveRequest, OkResponse, ReorderRequest, SearchQuery,
    SearchResponse, SemanticRequest, SemanticResponse, SnoozeRequest, StatisticsResponse,
    StatsQuery, SuggestionsQuery, SuggestionsResponse, SummarizeRequest, SummaryResponse,
    UpdateColumnRequest,
};
use crate::domain::{ColumnMeta, EmbeddingReport, OwnerId};
use crate::Api;

/// Header carrying the authenticated owner id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: Api,
    pub default_owner: OwnerId,
    /// Parent of every per-request search token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(api: Api, default_owner: OwnerId, shutdown: CancellationToken) -> Self {
        Self {
            api,
            default_owner,
            shutdown,
        }
    }

    fn owner(&self, headers: &HeaderMap) -> OwnerId {
        headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(OwnerId::from)
            .unwrap_or_else(|| self.default_owner.clone())
    }
}

/// Builds the router with every endpoint mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/search/semantic", post(semantic_search))
        .route("/search/suggestions", get(suggestions))
        .route("/search/generate-embeddings", post(generate_embeddings))
        .route("/kanban", get(board))
        .route("/kanban/meta", get(column_meta))
        .route("/kanban/move", post(move_email))
        .route("/kanban/snooze", post(snooze))
        .route("/kanban/summarize", post(summarize))
        .route("/kanban/columns", get(list_columns).post(create_column))
        .route("/kanban/columns/reorder", post(reorder_columns))
        .route("/kanban/columns/:id", put(update_column).delete(delete_column))
        .route("/statistics", get(statistics));

    Router::new().nest("/api", api).with_state(state)
}

/// Serves `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

fn shutdown_signal(token: CancellationToken) -> impl Future<Output = ()> + Send + 'static {
    async move { token.cancelled().await }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    // Dropped with the handler future when the client goes away.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let owner = state.owner(&headers);
    Ok(Json(state.api.search(&owner, query, &cancel).await?))
}

async fn semantic_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SemanticRequest>,
) -> ApiResult<Json<SemanticResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.semantic_search(&owner, request).await?))
}

async fn suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SuggestionsQuery>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.suggestions(&owner, &query.q).await?))
}

async fn generate_embeddings(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<GenerateEmbeddingsRequest>>,
) -> ApiResult<Json<EmbeddingReport>> {
    let owner = state.owner(&headers);
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(state.api.generate_embeddings(&owner, request).await?))
}

async fn board(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<BoardResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.board(&owner).await?))
}

async fn column_meta(State(state): State<AppState>) -> Json<Vec<ColumnMeta>> {
    Json(state.api.column_meta())
}

async fn move_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Json<OkResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.move_email(&owner, request).await?))
}

async fn snooze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SnoozeRequest>,
) -> ApiResult<Json<OkResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.snooze(&owner, request).await?))
}

async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.summarize(&owner, request).await?))
}

async fn list_columns(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ColumnsResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.list_columns(&owner).await?))
}

async fn create_column(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateColumnRequest>,
) -> ApiResult<Json<ColumnView>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.create_column(&owner, request).await?))
}

async fn update_column(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateColumnRequest>,
) -> ApiResult<Json<ColumnView>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.update_column(&owner, &id, request).await?))
}

async fn delete_column(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.delete_column(&owner, &id).await?))
}

async fn reorder_columns(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<OkResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.reorder_columns(&owner, request).await?))
}

async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatisticsResponse>> {
    let owner = state.owner(&headers);
    Ok(Json(state.api.statistics(&owner, query).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::Email;
    use crate::services::testing::{at, FakeEmbedder, FakeRemote};
    use crate::services::ExtractiveSummarizer;
    use crate::storage::queries::emails;
    use crate::storage::Database;
    use crate::Settings;

    async fn app() -> (Database, Router) {
        let db = Database::open_in_memory().await.unwrap();
        let api = Api::new(
            db.clone(),
            Arc::new(FakeRemote::new()),
            Arc::new(FakeEmbedder::new(2)),
            Arc::new(ExtractiveSummarizer::default()),
            &Settings::default(),
        );
        let state = AppState::new(api, OwnerId::from("u1"), CancellationToken::new());
        (db, router(state))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("GET")
            .body(Body::empty())
            .expect("request")
    }

    fn json_request(method: &str, uri: &str, owner: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method(method)
            .header("content-type", "application/json")
            .header(OWNER_HEADER, owner)
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_check() {
        let (_db, app) = app().await;
        let (status, body) = send(&app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn errors_render_as_json_with_status() {
        let (_db, app) = app().await;
        let (status, body) = send(&app, get_request("/api/search?q=%20%20")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("bad_request"));
    }

    #[tokio::test]
    async fn owner_header_scopes_requests() {
        let (db, app) = app().await;
        emails::upsert(&db, &Email::new("m1", "u2", at(1, 0)).with_subject("Plan"))
            .await
            .unwrap();

        let body = json!({"emailId": "m1", "toStatus": "done"});
        let (status, _) = send(&app, json_request("POST", "/api/kanban/move", "u1", body.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, value) = send(&app, json_request("POST", "/api/kanban/move", "u2", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!({"ok": true}));

        let request = Request::builder()
            .uri("/api/statistics?period=7d")
            .header(OWNER_HEADER, "u2")
            .body(Body::empty())
            .expect("request");
        let (status, value) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["period"], json!("7d"));
        assert_eq!(value["totalEmails"], json!(1));
        assert_eq!(value["statusStats"][0]["status"], json!("done"));
    }

    #[tokio::test]
    async fn default_columns_cannot_be_deleted() {
        let (_db, app) = app().await;
        let (status, listed) = send(&app, get_request("/api/kanban/columns")).await;
        assert_eq!(status, StatusCode::OK);

        let id = listed["columns"][0]["id"].as_str().expect("column id").to_string();
        let request = Request::builder()
            .uri(format!("/api/kanban/columns/{id}"))
            .method("DELETE")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], json!("forbidden"));
    }
}
