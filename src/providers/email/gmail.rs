//! Gmail API search adapter.
//!
//! Implements [`RemoteSearch`] on top of the Gmail REST API v1:
//! - `users.messages.list` with `q=` for keyword search
//! - `users.messages.get` with `format=full` for enrichment
//!
//! Authentication is a bearer access token supplied by the caller; token
//! acquisition and refresh happen outside this crate.

use async_trait::async_trait;
use base64::prelude::*;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde::Deserialize;
use url::Url;

use super::{ProviderError, RemotePage, RemoteSearch, Result, SearchStub};
use crate::domain::{Address, Email, EmailId, OwnerId};
use crate::search::strip_html;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_PAGE_SIZE: u32 = 25;

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
    next_page_token: Option<String>,
    result_size_estimate: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
    thread_id: Option<String>,
}

/// Gmail API message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    label_ids: Option<Vec<String>>,
    snippet: Option<String>,
    payload: Option<GmailPart>,
    internal_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// A MIME part. The top-level payload has the same shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

/// Gmail keyword search for one mailbox.
#[derive(Debug, Clone)]
pub struct GmailSearch {
    owner_id: OwnerId,
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    page_size: u32,
}

impl GmailSearch {
    /// Creates an adapter for the owner's mailbox using a bearer token.
    pub fn new(owner_id: OwnerId, access_token: impl Into<String>) -> Self {
        Self {
            owner_id,
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: GMAIL_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the number of stubs requested per search call.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Uses a shared HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        if self.access_token.trim().is_empty() {
            return Err(ProviderError::Authentication("no access token".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    fn search_url(&self, query: &str, page_token: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/messages", self.base_url))
            .map_err(|e| ProviderError::InvalidRequest(format!("base url: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("maxResults", &self.page_size.to_string());
            if let Some(token) = page_token.filter(|t| !t.is_empty()) {
                pairs.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }

    fn detail_url(&self, id: &EmailId) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/messages/", self.base_url))
            .and_then(|base| base.join(&id.0))
            .map_err(|e| ProviderError::InvalidRequest(format!("message url: {}", e)))?;
        url.query_pairs_mut().append_pair("format", "full");
        Ok(url)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }
}

#[async_trait]
impl RemoteSearch for GmailSearch {
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<RemotePage> {
        let url = self.search_url(query, page_token)?;
        let response: MessageListResponse = self.get(url).await?;

        tracing::debug!(
            owner_id = %self.owner_id,
            hits = response.messages.as_ref().map_or(0, Vec::len),
            "gmail search"
        );

        Ok(list_to_page(response))
    }

    async fn fetch_detail(&self, id: &EmailId) -> Result<Email> {
        let url = self.detail_url(id)?;
        let message: GmailMessage = self.get(url).await?;
        Ok(message_to_email(&self.owner_id, &message))
    }
}

/// Maps an error response onto a provider error.
async fn handle_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    error_for_status(status, retry_after, body)
}

fn error_for_status(status: u16, retry_after_secs: Option<u64>, body: String) -> ProviderError {
    match status {
        401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
        404 => ProviderError::NotFound(body),
        429 => ProviderError::RateLimited { retry_after_secs },
        _ => ProviderError::Provider(format!("API error ({}): {}", status, body)),
    }
}

fn list_to_page(response: MessageListResponse) -> RemotePage {
    let stubs = response
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|m| SearchStub {
            id: EmailId::from(m.id),
            thread_id: m.thread_id,
        })
        .collect();

    RemotePage {
        stubs,
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        approx_total: response.result_size_estimate.unwrap_or(0) as usize,
    }
}

fn decode_body(data: &str) -> Option<String> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| BASE64_URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Walks the MIME tree collecting the first plain and HTML bodies.
fn collect_bodies(part: &GmailPart, text: &mut Option<String>, html: &mut Option<String>) {
    let mime = part.mime_type.as_deref().unwrap_or("");
    let data = part.body.as_ref().and_then(|b| b.data.as_deref());

    if let Some(decoded) = data.and_then(decode_body) {
        if mime == "text/html" {
            html.get_or_insert(decoded);
        } else if mime == "text/plain" || part.parts.is_none() {
            text.get_or_insert(decoded);
        }
    }

    for child in part.parts.iter().flatten() {
        collect_bodies(child, text, html);
    }
}

/// Converts a Gmail message to the domain email.
///
/// The `Date` header wins when it parses; otherwise `internalDate` is used.
fn message_to_email(owner_id: &OwnerId, msg: &GmailMessage) -> Email {
    let headers = msg.payload.as_ref().and_then(|p| p.headers.as_ref());
    let get_header = |name: &str| -> Option<&str> {
        headers.and_then(|h| {
            h.iter()
                .find(|hdr| hdr.name.eq_ignore_ascii_case(name))
                .map(|hdr| hdr.value.as_str())
        })
    };

    let internal_date = msg
        .internal_date
        .as_deref()
        .and_then(|d| d.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis);
    let received_at = get_header("Date")
        .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
        .map(|d| d.with_timezone(&Utc))
        .or(internal_date)
        .unwrap_or_else(Utc::now);

    let (mut text, mut html) = (None, None);
    if let Some(payload) = &msg.payload {
        collect_bodies(payload, &mut text, &mut html);
    }
    let body_text = text
        .or_else(|| html.map(|h| strip_html(&h)))
        .unwrap_or_default();

    let mut email = Email::new(EmailId::from(msg.id.clone()), owner_id.clone(), received_at)
        .with_subject(get_header("Subject").unwrap_or_default())
        .with_body(body_text)
        .with_from(get_header("From").map(Address::parse).unwrap_or_else(|| Address::new("")))
        .with_labels(msg.label_ids.clone().unwrap_or_default());
    email.preview = msg.snippet.clone().unwrap_or_default();
    email
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(s: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(s)
    }

    fn provider() -> GmailSearch {
        GmailSearch::new(OwnerId::from("u1"), "token")
    }

    #[test]
    fn search_url_carries_query_and_page_size() {
        let url = provider()
            .with_base_url("https://mail.test/v1/")
            .search_url("from:alice invoice", Some("abc"))
            .unwrap();

        assert_eq!(url.path(), "/v1/messages");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "from:alice invoice".to_string()),
                ("maxResults".to_string(), "25".to_string()),
                ("pageToken".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn search_url_omits_empty_page_token() {
        let url = provider().search_url("x", Some("")).unwrap();
        assert!(!url.as_str().contains("pageToken"));
    }

    #[test]
    fn detail_url_requests_full_format() {
        let url = provider()
            .with_base_url("https://mail.test/v1")
            .detail_url(&EmailId::from("18c9f"))
            .unwrap();
        assert_eq!(url.as_str(), "https://mail.test/v1/messages/18c9f?format=full");
    }

    #[test]
    fn missing_token_is_an_auth_error() {
        let provider = GmailSearch::new(OwnerId::from("u1"), " ");
        assert!(matches!(
            provider.auth_headers(),
            Err(ProviderError::Authentication(_))
        ));
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(
            error_for_status(401, None, String::new()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(404, None, String::new()),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(429, Some(30), String::new()),
            ProviderError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
        assert!(matches!(
            error_for_status(500, None, String::new()),
            ProviderError::Provider(_)
        ));
    }

    #[test]
    fn list_response_maps_to_page() {
        let json = r#"{
            "messages": [{"id": "m1", "threadId": "t1"}, {"id": "m2", "threadId": "t2"}],
            "nextPageToken": "next",
            "resultSizeEstimate": 201
        }"#;
        let response: MessageListResponse = serde_json::from_str(json).unwrap();
        let page = list_to_page(response);

        assert_eq!(page.stubs.len(), 2);
        assert_eq!(page.stubs[0].id, EmailId::from("m1"));
        assert_eq!(page.stubs[0].thread_id.as_deref(), Some("t1"));
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        assert_eq!(page.approx_total, 201);
    }

    #[test]
    fn empty_list_response() {
        let response: MessageListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert_eq!(list_to_page(response), RemotePage::default());
    }

    #[test]
    fn message_maps_headers_body_and_labels() {
        let json = format!(
            r#"{{
                "id": "m1",
                "labelIds": ["INBOX", "UNREAD"],
                "snippet": "Your invoice is ready",
                "internalDate": "1700000000000",
                "payload": {{
                    "mimeType": "multipart/alternative",
                    "headers": [
                        {{"name": "Subject", "value": "Invoice #42"}},
                        {{"name": "From", "value": "\"Billing Team\" <billing@acme.test>"}},
                        {{"name": "Date", "value": "Tue, 14 Nov 2023 22:13:20 +0000"}}
                    ],
                    "parts": [
                        {{"mimeType": "text/html", "body": {{"data": "{}"}}}},
                        {{"mimeType": "text/plain", "body": {{"data": "{}"}}}}
                    ]
                }}
            }}"#,
            encode("<p>html body</p>"),
            encode("plain body")
        );
        let msg: GmailMessage = serde_json::from_str(&json).unwrap();
        let email = message_to_email(&OwnerId::from("u1"), &msg);

        assert_eq!(email.id, EmailId::from("m1"));
        assert_eq!(email.owner_id, OwnerId::from("u1"));
        assert_eq!(email.subject, "Invoice #42");
        assert_eq!(email.from, Address::with_name("billing@acme.test", "Billing Team"));
        assert_eq!(email.body_text, "plain body");
        assert_eq!(email.preview, "Your invoice is ready");
        assert_eq!(email.labels, vec!["INBOX", "UNREAD"]);
        assert_eq!(email.received_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn html_only_message_is_stripped() {
        let json = format!(
            r#"{{"id": "m2", "internalDate": "1700000000000",
                "payload": {{"mimeType": "text/html", "body": {{"data": "{}"}}}}}}"#,
            encode("<div>Hello <b>world</b></div>")
        );
        let msg: GmailMessage = serde_json::from_str(&json).unwrap();
        let email = message_to_email(&OwnerId::from("u1"), &msg);

        assert_eq!(email.body_text, "Hello world");
        assert_eq!(email.received_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(email.subject, "");
    }
}
