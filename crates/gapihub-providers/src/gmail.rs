//! Gmail messages in a date window.

use std::sync::Arc;

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use gapihub_core::{DateRange, EmailRecord};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::fetcher::{Fetcher, MAX_RESULTS};
use crate::transport::{BoxFuture, GMAIL_API_BASE, GoogleTransport, Query, get_decoded};

/// Gmail bodies are base64url, with or without padding.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct MessageRefList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// `users.messages.get` with `format=full`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: MessagePart,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl MessagePart {
    /// Case-insensitive header lookup; the last occurrence wins.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// Depth-first search for the first `text/plain` part.
    fn find_plain_text(&self) -> Option<&MessagePart> {
        self.parts.iter().find_map(|part| {
            if part.mime_type == "text/plain" {
                Some(part)
            } else {
                part.find_plain_text()
            }
        })
    }

    /// Encoded body data: the first plain-text part for multipart payloads,
    /// the payload's own body otherwise.
    fn body_data(&self) -> Option<&str> {
        if self.parts.is_empty() {
            self.data()
        } else {
            self.find_plain_text().and_then(MessagePart::data)
        }
    }
}

fn decode_body(data: &str) -> Result<String, String> {
    let bytes = BODY_ENGINE.decode(data).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Builds the `q` search string from the range's bounds.
///
/// Day bounds become midnight UTC, so `before:` excludes the end day itself.
pub fn search_query(range: &DateRange) -> String {
    let mut terms = Vec::new();
    if let Some(start) = &range.start {
        terms.push(format!("after:{}", start.start_of_range().timestamp()));
    }
    if let Some(end) = &range.end {
        terms.push(format!("before:{}", end.start_of_range().timestamp()));
    }
    terms.join(" ")
}

/// Reads the authenticated user's mailbox.
pub struct GmailFetcher {
    transport: Arc<dyn GoogleTransport>,
}

impl GmailFetcher {
    pub fn new(transport: Arc<dyn GoogleTransport>) -> Self {
        Self { transport }
    }

    /// Up to 100 messages matching `range`, each fetched in full.
    pub async fn get_emails(&self, range: &DateRange) -> ProviderResult<Vec<EmailRecord>> {
        let mut query: Query = vec![("maxResults", MAX_RESULTS.to_string())];
        let q = search_query(range);
        if !q.is_empty() {
            query.push(("q", q));
        }

        let list: MessageRefList = get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{GMAIL_API_BASE}/users/me/messages"),
            query,
            "users.messages.list",
        )
        .await?;
        debug!(count = list.messages.len(), "listed gmail messages");

        let mut records = Vec::with_capacity(list.messages.len());
        for message in &list.messages {
            let full = self.get_message(&message.id).await?;
            records.push(Self::format_message(&full));
        }
        Ok(records)
    }

    pub async fn get_message(&self, id: &str) -> ProviderResult<GmailMessage> {
        get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{GMAIL_API_BASE}/users/me/messages/{id}"),
            vec![("format", "full".to_string())],
            "users.messages.get",
        )
        .await
    }

    pub fn format_message(message: &GmailMessage) -> EmailRecord {
        let payload = &message.payload;
        let header = |name: &str| payload.header(name).unwrap_or_default().to_string();

        let body = match payload.body_data().map(decode_body) {
            Some(Ok(body)) => body,
            Some(Err(e)) => {
                warn!(id = %message.id, error = %e, "undecodable gmail body, leaving it empty");
                String::new()
            }
            None => String::new(),
        };

        let mut record = EmailRecord::new(message.id.clone(), message.thread_id.clone());
        record.sent_at = header("date");
        record.from = header("from");
        record.to = header("to");
        record.reply_to = header("reply-to");
        record.subject = header("subject");
        record.full_body = if body.is_empty() {
            message.snippet.clone()
        } else {
            body
        };
        record
    }
}

impl Fetcher for GmailFetcher {
    type Record = EmailRecord;

    const NAME: &'static str = "gmail";

    fn from_transport(transport: Arc<dyn GoogleTransport>) -> Self {
        Self::new(transport)
    }

    fn fetch<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<Self::Record>>> {
        Box::pin(self.get_emails(range))
    }
}
