//! Events on the user's primary calendar.

use std::sync::Arc;

use chrono::SecondsFormat;
use gapihub_core::{DateRange, EventRecord, MeetingType};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::fetcher::{Fetcher, MAX_RESULTS};
use crate::transport::{BoxFuture, CALENDAR_API_BASE, GoogleTransport, Query, get_decoded};

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// An event from `events.list` with `singleEvents=true`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<Person>,
    #[serde(default)]
    pub attendees: Vec<Person>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub hangout_link: Option<String>,
    pub conference_data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Person {
    pub email: Option<String>,
}

/// Timed events carry `dateTime`; all-day events carry `date`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl EventTime {
    fn as_string(&self) -> Option<String> {
        self.date_time.clone().or_else(|| self.date.clone())
    }
}

/// `timeMin`/`timeMax` covering whole days for date-only bounds.
pub fn time_window(range: &DateRange) -> Query {
    let mut query = Vec::new();
    if let Some(start) = &range.start {
        query.push((
            "timeMin",
            start
                .start_of_range()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ));
    }
    if let Some(end) = &range.end {
        query.push((
            "timeMax",
            end.end_of_range()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ));
    }
    query
}

pub struct CalendarFetcher {
    transport: Arc<dyn GoogleTransport>,
}

impl CalendarFetcher {
    pub fn new(transport: Arc<dyn GoogleTransport>) -> Self {
        Self { transport }
    }

    pub async fn get_events(&self, range: &DateRange) -> ProviderResult<Vec<EventRecord>> {
        let mut query = time_window(range);
        query.extend([
            ("maxResults", MAX_RESULTS.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ]);

        let list: EventList = get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{CALENDAR_API_BASE}/calendars/primary/events"),
            query,
            "events.list",
        )
        .await?;
        debug!(count = list.items.len(), "listed calendar events");

        Ok(list.items.iter().filter_map(Self::format_event).collect())
    }

    /// Returns `None` for events without an id or start time.
    pub fn format_event(event: &CalendarEvent) -> Option<EventRecord> {
        let start = event.start.as_ref().and_then(EventTime::as_string);
        let (Some(id), Some(start)) = (&event.id, start) else {
            warn!(id = ?event.id, "dropping calendar event without id or start");
            return None;
        };
        let end = event
            .end
            .as_ref()
            .and_then(EventTime::as_string)
            .unwrap_or_default();

        let mut record = EventRecord::new(id.clone(), start, end);
        record.organizer = event
            .organizer
            .as_ref()
            .and_then(|o| o.email.clone())
            .unwrap_or_default();
        record.attendees = event
            .attendees
            .iter()
            .filter_map(|a| a.email.clone())
            .collect();
        record.subject = event.summary.clone().unwrap_or_default();
        record.description = event.description.clone().unwrap_or_default();
        record.location = event.location.clone().unwrap_or_default();
        record.meeting_type = MeetingType::from_conferencing(
            event.hangout_link.is_some() || event.conference_data.is_some(),
        );
        Some(record)
    }
}

impl Fetcher for CalendarFetcher {
    type Record = EventRecord;

    const NAME: &'static str = "calendar";

    fn from_transport(transport: Arc<dyn GoogleTransport>) -> Self {
        Self::new(transport)
    }

    fn fetch<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<Self::Record>>> {
        Box::pin(self.get_events(range))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::fake::FakeTransport;

    const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

    fn parse(value: Value) -> CalendarEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn day_bounds_cover_whole_days() {
        let range = DateRange::parse(Some("2024-02-19"), Some("2024-02-20")).unwrap();
        assert_eq!(
            time_window(&range),
            vec![
                ("timeMin", "2024-02-19T00:00:00Z".to_string()),
                ("timeMax", "2024-02-20T23:59:59.999999Z".to_string()),
            ]
        );
    }

    #[test]
    fn timestamp_bounds_are_used_as_is() {
        let range = DateRange::parse(Some("2024-02-19T08:30:00Z"), None).unwrap();
        assert_eq!(
            time_window(&range),
            vec![("timeMin", "2024-02-19T08:30:00Z".to_string())]
        );
    }

    #[test]
    fn virtual_meeting() {
        let record = CalendarFetcher::format_event(&parse(json!({
            "id": "evt1",
            "summary": "Standup",
            "organizer": {"email": "ada@example.com"},
            "attendees": [{"email": "ada@example.com"}, {"email": "bob@example.com"}, {"displayName": "Room"}],
            "start": {"dateTime": "2024-02-19T10:00:00+01:00"},
            "end": {"dateTime": "2024-02-19T10:15:00+01:00"},
            "hangoutLink": "https://meet.google.com/abc-defg-hij",
        })))
        .unwrap();

        insta::assert_json_snapshot!(record, { ".Date_Extracted" => "[extracted]" }, @r#"
        {
          "Platform": "Google Calendar",
          "Event_ID": "evt1",
          "Organizer": "ada@example.com",
          "Attendees": [
            "ada@example.com",
            "bob@example.com"
          ],
          "Start_Time": "2024-02-19T10:00:00+01:00",
          "End_Time": "2024-02-19T10:15:00+01:00",
          "Subject": "Standup",
          "Description": "",
          "Location": "",
          "Meeting_Type": "Virtual",
          "Date_Extracted": "[extracted]"
        }
        "#);
    }

    #[test]
    fn conference_data_is_virtual() {
        let record = CalendarFetcher::format_event(&parse(json!({
            "id": "e", "start": {"dateTime": "t"}, "conferenceData": {"conferenceId": "x"},
        })))
        .unwrap();
        assert_eq!(record.meeting_type, MeetingType::Virtual);
    }

    #[test]
    fn all_day_in_person_event() {
        let record = CalendarFetcher::format_event(&parse(json!({
            "id": "e", "location": "Office",
            "start": {"date": "2024-02-19"}, "end": {"date": "2024-02-20"},
        })))
        .unwrap();
        assert_eq!(record.start_time, "2024-02-19");
        assert_eq!(record.end_time, "2024-02-20");
        assert_eq!(record.location, "Office");
        assert_eq!(record.meeting_type, MeetingType::InPerson);
        assert!(record.attendees.is_empty());
    }

    #[test]
    fn events_without_id_or_start_are_dropped() {
        assert!(CalendarFetcher::format_event(&parse(json!({"start": {"date": "2024-02-19"}}))).is_none());
        assert!(CalendarFetcher::format_event(&parse(json!({"id": "e", "start": {}}))).is_none());
    }

    #[tokio::test]
    async fn lists_primary_calendar() {
        let transport = Arc::new(FakeTransport::new().with_json(
            EVENTS_URL,
            json!({"items": [
                {"id": "a", "start": {"dateTime": "2024-02-19T09:00:00Z"}, "end": {"dateTime": "2024-02-19T10:00:00Z"}},
                {"id": "b"},
                {"id": "c", "start": {"date": "2024-02-20"}},
            ]}),
        ));
        let calendar = CalendarFetcher::new(transport.clone());
        let range = DateRange::parse(Some("2024-02-19"), Some("2024-02-20")).unwrap();
        let records = calendar.fetch(&range).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(transport.param(EVENTS_URL, "singleEvents").as_deref(), Some("true"));
        assert_eq!(transport.param(EVENTS_URL, "orderBy").as_deref(), Some("startTime"));
        assert_eq!(transport.param(EVENTS_URL, "maxResults").as_deref(), Some("100"));
        assert_eq!(
            transport.param(EVENTS_URL, "timeMax").as_deref(),
            Some("2024-02-20T23:59:59.999999Z")
        );
    }
}
