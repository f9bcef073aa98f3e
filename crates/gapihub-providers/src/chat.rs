//! Google Chat messages across every space the user belongs to.
//!
//! Only the first page of `spaces.list` and of each space's
//! `spaces.messages.list` is read; the page size doubles as the record limit.
//! Date filtering compares the `YYYY-MM-DD` prefix of `createTime` with the
//! caller's raw bound as plain strings.

use std::sync::Arc;

use gapihub_core::{CARD_PLACEHOLDER, ChatRecord, DateRange, is_on_or_after, is_on_or_before};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ProviderErrorCode, ProviderResult};
use crate::fetcher::{Fetcher, MAX_RESULTS};
use crate::transport::{BoxFuture, CHAT_API_BASE, GoogleTransport, get_decoded};

const SPACE_PREFIX: &str = "spaces/";

/// Which messages [`ChatFetcher::get_messages`] should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageQuery {
    /// One space, optionally keeping only messages whose `createTime`
    /// contains `date`.
    Space { space: String, date: Option<String> },
    /// Every space, with the same optional substring filter.
    AllSpaces { date: Option<String> },
    /// Every space, keeping messages whose creation day lies in `start..=end`.
    DateRange {
        start: Option<String>,
        end: Option<String>,
    },
}

impl MessageQuery {
    /// Resolves the older two-argument call convention.
    ///
    /// A first argument that starts with `20` and contains `-` is a start
    /// date, making the second argument the end date. Otherwise the first
    /// argument names a space and the second is a date substring.
    pub fn from_legacy_args(first: Option<&str>, second: Option<&str>) -> Self {
        let second = second.map(str::to_string);
        match first {
            Some(first) if first.starts_with("20") && first.contains('-') => Self::DateRange {
                start: Some(first.to_string()),
                end: second,
            },
            Some(space) => Self::Space {
                space: space.to_string(),
                date: second,
            },
            None => Self::AllSpaces { date: second },
        }
    }
}

/// A chat space from `spaces.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSpace {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpaceList {
    #[serde(default)]
    spaces: Vec<ChatSpace>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<Value>,
}

/// A message as returned by `spaces.messages.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub name: Option<String>,
    pub create_time: Option<String>,
    pub text: Option<String>,
    pub formatted_text: Option<FormattedText>,
    pub cards: Option<Value>,
    pub cards_v2: Option<Value>,
    pub sender: Option<RawUser>,
    pub space: Option<RawSpace>,
    pub thread: Option<RawThread>,
}

/// `formattedText` is a string in the v1 API; older payloads nest it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FormattedText {
    Plain(String),
    Structured {
        #[serde(default)]
        text: String,
    },
}

impl FormattedText {
    fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Structured { text } => text,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSpace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThread {
    #[serde(default)]
    pub name: String,
}

fn space_path(space: &str) -> String {
    if space.starts_with(SPACE_PREFIX) {
        space.to_string()
    } else {
        format!("{SPACE_PREFIX}{space}")
    }
}

/// Reads Google Chat through a [`GoogleTransport`].
pub struct ChatFetcher {
    transport: Arc<dyn GoogleTransport>,
}

impl ChatFetcher {
    pub fn new(transport: Arc<dyn GoogleTransport>) -> Self {
        Self { transport }
    }

    /// First page of the spaces the user can see.
    pub async fn list_spaces(&self) -> ProviderResult<Vec<ChatSpace>> {
        let list: SpaceList = get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{CHAT_API_BASE}/spaces"),
            Vec::new(),
            "spaces.list",
        )
        .await?;
        debug!(count = list.spaces.len(), "listed chat spaces");
        Ok(list.spaces)
    }

    /// First page of messages in `space`, which may omit the `spaces/` prefix.
    ///
    /// Items that do not deserialize are dropped with a warning.
    pub async fn list_messages(
        &self,
        space: &str,
        page_size: usize,
    ) -> ProviderResult<Vec<RawMessage>> {
        let parent = space_path(space);
        let list: MessageList = get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{CHAT_API_BASE}/{parent}/messages"),
            vec![("pageSize", page_size.to_string())],
            "spaces.messages.list",
        )
        .await?;

        let messages = list
            .messages
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawMessage>(item) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(space = %parent, error = %e, "dropping malformed chat message");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(space = %parent, count = messages.len(), "listed chat messages");
        Ok(messages)
    }

    /// Like [`list_messages`](Self::list_messages), but a space that vanished
    /// or is off-limits yields no messages instead of failing the request.
    async fn list_messages_in_fanout(
        &self,
        space: &ChatSpace,
        page_size: usize,
    ) -> ProviderResult<Vec<RawMessage>> {
        match self.list_messages(&space.name, page_size).await {
            Err(e)
                if matches!(
                    e.code(),
                    ProviderErrorCode::NotFound | ProviderErrorCode::AuthorizationFailed
                ) =>
            {
                warn!(space = %space.name, error = %e, "skipping chat space");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Dispatches on an explicit [`MessageQuery`], returning at most `limit` records.
    pub async fn get_messages(
        &self,
        query: &MessageQuery,
        limit: usize,
    ) -> ProviderResult<Vec<ChatRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let (raw, date) = match query {
            MessageQuery::DateRange { start, end } => {
                return self
                    .get_messages_by_date_range(start.as_deref(), end.as_deref(), limit)
                    .await;
            }
            MessageQuery::Space { space, date } => (self.list_messages(space, limit).await?, date),
            MessageQuery::AllSpaces { date } => {
                let mut raw = Vec::new();
                for space in self.list_spaces().await? {
                    raw.extend(self.list_messages_in_fanout(&space, limit).await?);
                    if raw.len() >= limit {
                        raw.truncate(limit);
                        break;
                    }
                }
                (raw, date)
            }
        };

        let matches_date = |message: &RawMessage| match date {
            Some(date) => message
                .create_time
                .as_deref()
                .is_some_and(|time| time.contains(date.as_str())),
            None => true,
        };

        let mut records = Vec::new();
        push_records(&mut records, raw.iter().filter(|m| matches_date(m)), limit);
        Ok(records)
    }

    /// Every message in the first page of one space.
    pub async fn get_messages_by_space(
        &self,
        space_id: &str,
        limit: Option<usize>,
    ) -> ProviderResult<Vec<ChatRecord>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        let raw = self
            .list_messages(space_id, limit.unwrap_or(MAX_RESULTS))
            .await?;
        let mut records = Vec::new();
        push_records(&mut records, raw.iter(), limit.unwrap_or(usize::MAX));
        Ok(records)
    }

    /// The first page of every space, stopping once `limit` records are collected.
    pub async fn get_all_messages(&self, limit: Option<usize>) -> ProviderResult<Vec<ChatRecord>> {
        let cap = limit.unwrap_or(usize::MAX);
        let mut records = Vec::new();
        if cap == 0 {
            return Ok(records);
        }

        for space in self.list_spaces().await? {
            let raw = self
                .list_messages_in_fanout(&space, limit.unwrap_or(MAX_RESULTS))
                .await?;
            push_records(&mut records, raw.iter(), cap);
            if records.len() >= cap {
                break;
            }
        }
        Ok(records)
    }

    /// Messages from every space whose creation day lies within `start..=end`.
    ///
    /// Bounds are compared as strings against the part of `createTime` before
    /// the `T`, so `2024-02-19` and `2024-02-19T23:00:00Z` both admit every
    /// message created on the 19th. Stops as soon as `limit` records are found.
    pub async fn get_messages_by_date_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        limit: usize,
    ) -> ProviderResult<Vec<ChatRecord>> {
        let mut records = Vec::new();
        if limit == 0 {
            return Ok(records);
        }

        let in_range = |message: &&RawMessage| {
            let created = message.create_time.as_deref().unwrap_or_default();
            start.is_none_or(|start| is_on_or_after(created, start))
                && end.is_none_or(|end| is_on_or_before(created, end))
        };

        for space in self.list_spaces().await? {
            let raw = self.list_messages_in_fanout(&space, limit).await?;
            push_records(&mut records, raw.iter().filter(in_range), limit);
            if records.len() >= limit {
                break;
            }
        }

        debug!(count = records.len(), ?start, ?end, "chat messages in range");
        Ok(records)
    }

    /// Flattens one message. Returns `None` without a `name` or `createTime`.
    pub fn message_details(message: &RawMessage) -> Option<ChatRecord> {
        let (Some(name), Some(create_time)) = (&message.name, &message.create_time) else {
            return None;
        };

        let content = if let Some(text) = &message.text {
            text.clone()
        } else if let Some(formatted) = &message.formatted_text {
            formatted.as_str().to_string()
        } else if message.cards.is_some() || message.cards_v2.is_some() {
            CARD_PLACEHOLDER.to_string()
        } else {
            String::new()
        };

        let mut record = ChatRecord::new(name.clone(), create_time.clone());
        record.message = content;
        if let Some(sender) = &message.sender {
            record.from = if sender.display_name.is_empty() {
                sender.name.clone()
            } else {
                sender.display_name.clone()
            };
        }
        if let Some(space) = &message.space {
            record.channel = space.display_name.clone();
        }
        if let Some(thread) = &message.thread {
            record.thread_id = thread.name.clone();
        }
        Some(record)
    }
}

/// Formats messages into `records` until it holds `limit` entries.
fn push_records<'a>(
    records: &mut Vec<ChatRecord>,
    messages: impl Iterator<Item = &'a RawMessage>,
    limit: usize,
) {
    for message in messages {
        if records.len() >= limit {
            return;
        }
        match ChatFetcher::message_details(message) {
            Some(record) => records.push(record),
            None => warn!(
                name = message.name.as_deref().unwrap_or("<unnamed>"),
                "dropping chat message without name or createTime"
            ),
        }
    }
}

impl Fetcher for ChatFetcher {
    type Record = ChatRecord;

    const NAME: &'static str = "chat";

    fn from_transport(transport: Arc<dyn GoogleTransport>) -> Self {
        Self::new(transport)
    }

    fn fetch<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<Self::Record>>> {
        Box::pin(self.get_messages_by_date_range(range.start_raw(), range.end_raw(), MAX_RESULTS))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::fake::FakeTransport;

    const SPACES_URL: &str = "https://chat.googleapis.com/v1/spaces";

    fn messages_url(space: &str) -> String {
        format!("https://chat.googleapis.com/v1/spaces/{space}/messages")
    }

    fn message(space: &str, id: &str, created: &str) -> Value {
        json!({
            "name": format!("spaces/{space}/messages/{id}"),
            "createTime": created,
            "text": format!("message {id}"),
            "sender": {"name": "users/1", "displayName": "Ada"},
            "space": {"name": format!("spaces/{space}"), "displayName": format!("Space {space}")},
            "thread": {"name": format!("spaces/{space}/threads/t{id}")},
        })
    }

    fn parse(value: Value) -> RawMessage {
        serde_json::from_value(value).unwrap()
    }

    /// Two spaces with three messages each, spread over Feb 18-21.
    fn two_spaces() -> FakeTransport {
        FakeTransport::new()
            .with_json(
                SPACES_URL,
                json!({"spaces": [
                    {"name": "spaces/AAA", "displayName": "Space AAA", "spaceType": "SPACE"},
                    {"name": "spaces/BBB", "displayName": "Space BBB", "spaceType": "SPACE"},
                ]}),
            )
            .with_json(
                messages_url("AAA"),
                json!({"messages": [
                    message("AAA", "1", "2024-02-18T09:00:00.000000Z"),
                    message("AAA", "2", "2024-02-19T09:00:00.000000Z"),
                    message("AAA", "3", "2024-02-20T23:59:00.000000Z"),
                ]}),
            )
            .with_json(
                messages_url("BBB"),
                json!({"messages": [
                    message("BBB", "4", "2024-02-19T00:00:00.000000Z"),
                    message("BBB", "5", "2024-02-21T08:00:00.000000Z"),
                    message("BBB", "6", "2024-02-20T12:00:00.000000Z"),
                ]}),
            )
    }

    fn ids(records: &[ChatRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.chat_id.rsplit('/').next().unwrap_or_default())
            .collect()
    }

    fn fetcher(transport: FakeTransport) -> (ChatFetcher, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        (ChatFetcher::new(transport.clone()), transport)
    }

    mod details {
        use super::*;

        #[test]
        fn plain_text_message() {
            let record = ChatFetcher::message_details(&parse(message("AAA", "1", "2024-02-19T10:00:00Z")))
                .unwrap();
            assert_eq!(record.message, "message 1");
            assert_eq!(record.from, "Ada");
            assert_eq!(record.channel, "Space AAA");
            assert_eq!(record.thread_id, "spaces/AAA/threads/t1");
            assert_eq!(record.timestamp, "2024-02-19T10:00:00Z");
            assert_eq!(record.platform, "Google Chat");
        }

        #[test]
        fn formatted_text_as_string_or_object() {
            let plain = parse(json!({"name": "m", "createTime": "t", "formattedText": "*bold*"}));
            assert_eq!(ChatFetcher::message_details(&plain).unwrap().message, "*bold*");

            let nested = parse(json!({"name": "m", "createTime": "t", "formattedText": {"text": "nested"}}));
            assert_eq!(ChatFetcher::message_details(&nested).unwrap().message, "nested");
        }

        #[test]
        fn text_wins_over_formatted_text() {
            let raw = parse(json!({"name": "m", "createTime": "t", "text": "hello", "formattedText": "*hello*"}));
            assert_eq!(ChatFetcher::message_details(&raw).unwrap().message, "hello");
        }

        #[test]
        fn card_only_messages_get_placeholder() {
            let cards = parse(json!({"name": "m", "createTime": "t", "cards": [{"header": {}}]}));
            assert_eq!(
                ChatFetcher::message_details(&cards).unwrap().message,
                "Card content (not plain text)"
            );

            let cards_v2 = parse(json!({"name": "m", "createTime": "t", "cardsV2": [{"cardId": "c"}]}));
            assert_eq!(
                ChatFetcher::message_details(&cards_v2).unwrap().message,
                CARD_PLACEHOLDER
            );
        }

        #[test]
        fn no_content_is_empty() {
            let raw = parse(json!({"name": "m", "createTime": "t"}));
            assert_eq!(ChatFetcher::message_details(&raw).unwrap().message, "");
        }

        #[test]
        fn missing_sender_and_space_degrade_to_empty() {
            let raw = parse(json!({"name": "m", "createTime": "t", "text": "x"}));
            let record = ChatFetcher::message_details(&raw).unwrap();
            assert_eq!(record.from, "");
            assert_eq!(record.channel, "");
            assert_eq!(record.thread_id, "");
        }

        #[test]
        fn sender_name_used_without_display_name() {
            let raw = parse(json!({"name": "m", "createTime": "t", "sender": {"name": "users/42"}}));
            assert_eq!(ChatFetcher::message_details(&raw).unwrap().from, "users/42");
        }

        #[test]
        fn name_and_create_time_are_required() {
            assert!(ChatFetcher::message_details(&parse(json!({"createTime": "t"}))).is_none());
            assert!(ChatFetcher::message_details(&parse(json!({"name": "m"}))).is_none());
        }

        #[test]
        fn record_snapshot() {
            let record =
                ChatFetcher::message_details(&parse(message("AAA", "7", "2024-02-19T10:00:00Z")))
                    .unwrap();
            insta::assert_json_snapshot!(record, { ".Date_Extracted" => "[extracted]" }, @r#"
            {
              "Platform": "Google Chat",
              "Chat_ID": "spaces/AAA/messages/7",
              "From": "Ada",
              "Channel": "Space AAA",
              "Message": "message 7",
              "Timestamp": "2024-02-19T10:00:00Z",
              "Thread_ID": "spaces/AAA/threads/t7",
              "Date_Extracted": "[extracted]"
            }
            "#);
        }
    }

    mod legacy_args {
        use super::*;

        #[test]
        fn date_like_first_argument_is_a_range() {
            assert_eq!(
                MessageQuery::from_legacy_args(Some("2024-02-01"), Some("2024-02-28")),
                MessageQuery::DateRange {
                    start: Some("2024-02-01".to_string()),
                    end: Some("2024-02-28".to_string()),
                }
            );
        }

        #[test]
        fn other_first_argument_is_a_space() {
            assert_eq!(
                MessageQuery::from_legacy_args(Some("abc123"), None),
                MessageQuery::Space {
                    space: "abc123".to_string(),
                    date: None,
                }
            );
            // Starts with "20" but has no dash: still a space id.
            assert!(matches!(
                MessageQuery::from_legacy_args(Some("2024abc"), None),
                MessageQuery::Space { .. }
            ));
        }

        #[test]
        fn no_first_argument_is_all_spaces() {
            assert_eq!(
                MessageQuery::from_legacy_args(None, Some("2024-02-19")),
                MessageQuery::AllSpaces {
                    date: Some("2024-02-19".to_string()),
                }
            );
        }
    }

    mod date_range {
        use super::*;

        #[tokio::test]
        async fn inclusive_day_bounds() {
            let (chat, _) = fetcher(two_spaces());
            let records = chat
                .get_messages_by_date_range(Some("2024-02-19"), Some("2024-02-20"), 100)
                .await
                .unwrap();
            assert_eq!(ids(&records), vec!["2", "3", "4", "6"]);
        }

        #[tokio::test]
        async fn open_ended_bounds() {
            let (chat, _) = fetcher(two_spaces());
            let after = chat
                .get_messages_by_date_range(Some("2024-02-20"), None, 100)
                .await
                .unwrap();
            assert_eq!(ids(&after), vec!["3", "5", "6"]);

            let (chat, _) = fetcher(two_spaces());
            let before = chat
                .get_messages_by_date_range(None, Some("2024-02-18"), 100)
                .await
                .unwrap();
            assert_eq!(ids(&before), vec!["1"]);
        }

        #[tokio::test]
        async fn timestamp_end_bound_compares_as_string() {
            // "2024-02-20" <= "2024-02-20T00:00:00Z", so all of the 20th is kept.
            let (chat, _) = fetcher(two_spaces());
            let records = chat
                .get_messages_by_date_range(None, Some("2024-02-20T00:00:00Z"), 100)
                .await
                .unwrap();
            assert_eq!(ids(&records), vec!["1", "2", "3", "4", "6"]);
        }

        #[tokio::test]
        async fn stops_at_limit_without_visiting_later_spaces() {
            let (chat, transport) = fetcher(two_spaces());
            let records = chat
                .get_messages_by_date_range(None, None, 2)
                .await
                .unwrap();
            assert_eq!(ids(&records), vec!["1", "2"]);
            assert_eq!(transport.urls(), vec![SPACES_URL.to_string(), messages_url("AAA")]);
            assert_eq!(
                transport.param(&messages_url("AAA"), "pageSize").as_deref(),
                Some("2")
            );
        }

        #[tokio::test]
        async fn truncates_inside_the_last_space() {
            let (chat, _) = fetcher(two_spaces());
            let records = chat
                .get_messages_by_date_range(Some("2024-02-19"), None, 3)
                .await
                .unwrap();
            assert_eq!(ids(&records), vec!["2", "3", "4"]);
        }

        #[tokio::test]
        async fn zero_limit_makes_no_calls() {
            let (chat, transport) = fetcher(two_spaces());
            assert!(chat.get_messages_by_date_range(None, None, 0).await.unwrap().is_empty());
            assert!(transport.calls().is_empty());
        }

        #[tokio::test]
        async fn fetch_uses_raw_bounds_and_default_limit() {
            let (chat, transport) = fetcher(two_spaces());
            let range = DateRange::parse(Some("2024-02-21"), None).unwrap();
            let records = chat.fetch(&range).await.unwrap();
            assert_eq!(ids(&records), vec!["5"]);
            assert_eq!(
                transport.param(&messages_url("BBB"), "pageSize").as_deref(),
                Some("100")
            );
        }

        #[tokio::test]
        async fn no_spaces_is_empty() {
            let (chat, _) = fetcher(FakeTransport::new().with_json(SPACES_URL, json!({})));
            assert!(chat.get_messages_by_date_range(None, None, 10).await.unwrap().is_empty());
        }
    }

    mod queries {
        use super::*;

        #[tokio::test]
        async fn legacy_range_matches_date_range_call() {
            let query = MessageQuery::from_legacy_args(Some("2024-02-19"), Some("2024-02-20"));
            let (chat, _) = fetcher(two_spaces());
            let via_query = chat.get_messages(&query, 50).await.unwrap();

            let (chat, _) = fetcher(two_spaces());
            let direct = chat
                .get_messages_by_date_range(Some("2024-02-19"), Some("2024-02-20"), 50)
                .await
                .unwrap();
            assert_eq!(ids(&via_query), ids(&direct));
        }

        #[tokio::test]
        async fn space_query_prefixes_space_name() {
            let transport = FakeTransport::new().with_json(
                messages_url("abc123"),
                json!({"messages": [message("abc123", "1", "2024-02-19T10:00:00Z")]}),
            );
            let (chat, transport) = fetcher(transport);
            let query = MessageQuery::from_legacy_args(Some("abc123"), None);
            let records = chat.get_messages(&query, 10).await.unwrap();
            assert_eq!(ids(&records), vec!["1"]);
            assert_eq!(transport.urls(), vec![messages_url("abc123")]);
        }

        #[tokio::test]
        async fn all_spaces_with_date_substring() {
            let (chat, _) = fetcher(two_spaces());
            let query = MessageQuery::AllSpaces {
                date: Some("2024-02-19".to_string()),
            };
            let records = chat.get_messages(&query, 100).await.unwrap();
            assert_eq!(ids(&records), vec!["2", "4"]);
        }

        #[tokio::test]
        async fn all_spaces_truncates_before_filtering() {
            // The first two messages are collected, then filtered by date.
            let (chat, transport) = fetcher(two_spaces());
            let query = MessageQuery::AllSpaces {
                date: Some("2024-02-19".to_string()),
            };
            let records = chat.get_messages(&query, 2).await.unwrap();
            assert_eq!(ids(&records), vec!["2"]);
            assert_eq!(transport.urls().len(), 2);
        }

        #[tokio::test]
        async fn by_space_and_all_messages() {
            let (chat, transport) = fetcher(two_spaces());
            let records = chat.get_messages_by_space("spaces/BBB", None).await.unwrap();
            assert_eq!(ids(&records), vec!["4", "5", "6"]);
            assert_eq!(
                transport.param(&messages_url("BBB"), "pageSize").as_deref(),
                Some("100")
            );

            let (chat, _) = fetcher(two_spaces());
            let records = chat.get_all_messages(Some(4)).await.unwrap();
            assert_eq!(ids(&records), vec!["1", "2", "3", "4"]);

            let (chat, _) = fetcher(two_spaces());
            assert_eq!(chat.get_all_messages(None).await.unwrap().len(), 6);
        }

        #[tokio::test]
        async fn zero_limit_by_space_skips_the_api() {
            let (chat, transport) = fetcher(two_spaces());
            let records = chat.get_messages_by_space("spaces/BBB", Some(0)).await.unwrap();
            assert!(records.is_empty());
            assert!(transport.urls().is_empty());
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn list_spaces_error_propagates() {
            let (chat, _) = fetcher(FakeTransport::new().with_error(
                SPACES_URL,
                ProviderErrorCode::AuthenticationFailed,
                "token revoked",
            ));
            let err = chat
                .get_messages_by_date_range(None, None, 10)
                .await
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
            assert_eq!(err.provider(), Some("chat"));
        }

        #[tokio::test]
        async fn inaccessible_space_is_skipped() {
            let transport = FakeTransport::new()
                .with_json(
                    SPACES_URL,
                    json!({"spaces": [{"name": "spaces/GONE"}, {"name": "spaces/BBB"}]}),
                )
                .with_error(messages_url("GONE"), ProviderErrorCode::NotFound, "gone")
                .with_json(
                    messages_url("BBB"),
                    json!({"messages": [message("BBB", "4", "2024-02-19T00:00:00Z")]}),
                );
            let (chat, _) = fetcher(transport);
            let records = chat.get_messages_by_date_range(None, None, 10).await.unwrap();
            assert_eq!(ids(&records), vec!["4"]);
        }

        #[tokio::test]
        async fn server_error_in_a_space_propagates() {
            let transport = FakeTransport::new()
                .with_json(SPACES_URL, json!({"spaces": [{"name": "spaces/AAA"}]}))
                .with_error(messages_url("AAA"), ProviderErrorCode::ServerError, "boom");
            let (chat, _) = fetcher(transport);
            let err = chat.get_all_messages(None).await.unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ServerError);
        }

        #[tokio::test]
        async fn malformed_messages_are_dropped() {
            let transport = FakeTransport::new()
                .with_json(SPACES_URL, json!({"spaces": [{"name": "spaces/AAA"}]}))
                .with_json(
                    messages_url("AAA"),
                    json!({"messages": [
                        {"name": 17, "createTime": "2024-02-19T00:00:00Z"},
                        {"name": "spaces/AAA/messages/nodate"},
                        message("AAA", "ok", "2024-02-19T00:00:00Z"),
                    ]}),
                );
            let (chat, _) = fetcher(transport);
            let records = chat.get_messages_by_date_range(None, None, 10).await.unwrap();
            assert_eq!(ids(&records), vec!["ok"]);
        }

        #[tokio::test]
        async fn malformed_space_list_is_invalid_response() {
            let (chat, _) =
                fetcher(FakeTransport::new().with_json(SPACES_URL, json!({"spaces": "nope"})));
            let err = chat.list_spaces().await.unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        }
    }
}
