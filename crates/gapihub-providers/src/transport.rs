//! The seam between fetchers and Google's HTTP APIs.
//!
//! Fetchers only ever issue authenticated `GET` requests that return JSON.
//! [`GoogleTransport`] captures exactly that, so fetchers can be exercised
//! against canned responses and the real [`HttpTransport`] stays the only
//! place that knows about reqwest, bearer tokens and status codes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::google::CredentialProvider;

/// Gmail API v1.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
/// Google Chat API v1.
pub const CHAT_API_BASE: &str = "https://chat.googleapis.com/v1";
/// Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
/// Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Query-string pairs for a request.
pub type Query = Vec<(&'static str, String)>;

/// Authenticated JSON `GET` against a Google API.
pub trait GoogleTransport: Send + Sync {
    /// Issues `GET url?query` and returns the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Non-success statuses map to the matching [`ProviderError`] code;
    /// transport failures map to `NetworkError`.
    fn get_json(&self, url: String, query: Query) -> BoxFuture<'_, ProviderResult<Value>>;
}

/// Decodes a JSON value into a typed API response.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ProviderResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse {what} response: {e}"))
            .with_source(e)
    })
}

/// `GET` plus [`decode`], with any error tagged as coming from `provider`.
pub(crate) async fn get_decoded<T: DeserializeOwned>(
    transport: &dyn GoogleTransport,
    provider: &'static str,
    url: String,
    query: Query,
    what: &str,
) -> ProviderResult<T> {
    let value = transport
        .get_json(url, query)
        .await
        .map_err(|e| e.with_provider(provider))?;
    decode(value, what).map_err(|e| e.with_provider(provider))
}

/// reqwest-backed transport that pulls a fresh access token per request.
pub struct HttpTransport {
    http_client: reqwest::Client,
    credentials: Arc<CredentialProvider>,
}

impl HttpTransport {
    /// Creates a transport sharing the given credential provider.
    pub fn new(
        credentials: Arc<CredentialProvider>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {e}"))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            credentials,
        })
    }

    async fn send(&self, url: String, query: Query) -> ProviderResult<Value> {
        let access_token = self.credentials.access_token().await?;

        debug!(%url, params = query.len(), "GET");
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    format!("request failed: {e}")
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &headers, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("response is not JSON: {e}")).with_source(e)
        })
    }
}

impl GoogleTransport for HttpTransport {
    fn get_json(&self, url: String, query: Query) -> BoxFuture<'_, ProviderResult<Value>> {
        Box::pin(self.send(url, query))
    }
}

/// Maps a non-success Google API response to a [`ProviderError`].
pub fn error_for_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let detail = google_error_message(body).unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication(format!("access token expired or invalid: {detail}"))
        }
        StatusCode::FORBIDDEN => ProviderError::authorization(format!("access denied: {detail}")),
        StatusCode::NOT_FOUND => ProviderError::not_found(detail),
        StatusCode::BAD_REQUEST => {
            ProviderError::bad_request(format!("rejected by Google API: {detail}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {s} seconds"))
                    .unwrap_or_default()
            ))
        }
        _ => ProviderError::server(format!("API error ({status}): {detail}")),
    }
}

/// Pulls `error.message` out of a Google JSON error envelope.
fn google_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}
