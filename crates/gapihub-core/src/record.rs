//! Normalized records returned by the gateway.
//!
//! Each platform gets a flat struct whose serialized keys match the public
//! JSON shape (`Platform`, `Chat_ID`, `Date_Extracted`, ...). Records carry no
//! identity beyond their position in the response array.

use serde::{Deserialize, Serialize};

use crate::date::extraction_timestamp;

/// `Platform` tag values.
pub mod platform {
    pub const CHAT: &str = "Google Chat";
    pub const GMAIL: &str = "Gmail";
    pub const CALENDAR: &str = "Google Calendar";
    pub const DOCS: &str = "Google Docs";
}

/// Placeholder content for chat messages that only carry cards.
pub const CARD_PLACEHOLDER: &str = "Card content (not plain text)";

/// A Google Chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Chat_ID")]
    pub chat_id: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Thread_ID")]
    pub thread_id: String,
    #[serde(rename = "Date_Extracted")]
    pub date_extracted: String,
}

impl ChatRecord {
    /// Creates a chat record stamped with the current extraction time.
    pub fn new(chat_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            platform: platform::CHAT.to_string(),
            chat_id: chat_id.into(),
            from: String::new(),
            channel: String::new(),
            message: String::new(),
            timestamp: timestamp.into(),
            thread_id: String::new(),
            date_extracted: extraction_timestamp(),
        }
    }
}

/// A Gmail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Email_ID")]
    pub email_id: String,
    #[serde(rename = "Sent_At")]
    pub sent_at: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Conversation_ID")]
    pub conversation_id: String,
    #[serde(rename = "Reply_To")]
    pub reply_to: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Full_Body")]
    pub full_body: String,
    #[serde(rename = "Date_Extracted")]
    pub date_extracted: String,
}

impl EmailRecord {
    /// Creates an email record stamped with the current extraction time.
    pub fn new(email_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            platform: platform::GMAIL.to_string(),
            email_id: email_id.into(),
            sent_at: String::new(),
            from: String::new(),
            to: String::new(),
            conversation_id: conversation_id.into(),
            reply_to: String::new(),
            subject: String::new(),
            full_body: String::new(),
            date_extracted: extraction_timestamp(),
        }
    }
}

/// How a calendar event is attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingType {
    Virtual,
    #[serde(rename = "In-person")]
    InPerson,
}

impl MeetingType {
    /// Virtual when the event has any video-conferencing data.
    pub fn from_conferencing(has_conferencing: bool) -> Self {
        if has_conferencing {
            Self::Virtual
        } else {
            Self::InPerson
        }
    }
}

/// A Google Calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Event_ID")]
    pub event_id: String,
    #[serde(rename = "Organizer")]
    pub organizer: String,
    #[serde(rename = "Attendees")]
    pub attendees: Vec<String>,
    #[serde(rename = "Start_Time")]
    pub start_time: String,
    #[serde(rename = "End_Time")]
    pub end_time: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Meeting_Type")]
    pub meeting_type: MeetingType,
    #[serde(rename = "Date_Extracted")]
    pub date_extracted: String,
}

impl EventRecord {
    /// Creates an in-person event record stamped with the current extraction time.
    pub fn new(
        event_id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform::CALENDAR.to_string(),
            event_id: event_id.into(),
            organizer: String::new(),
            attendees: Vec::new(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            subject: String::new(),
            description: String::new(),
            location: String::new(),
            meeting_type: MeetingType::InPerson,
            date_extracted: extraction_timestamp(),
        }
    }
}

/// A Google Docs modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocActivityRecord {
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Activity_ID")]
    pub activity_id: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "File_Type")]
    pub file_type: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Date_Extracted")]
    pub date_extracted: String,
}

impl DocActivityRecord {
    /// File type reported for every Docs record.
    pub const FILE_TYPE: &'static str = "Document";

    /// Creates a document record stamped with the current extraction time.
    pub fn new(activity_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            platform: platform::DOCS.to_string(),
            activity_id: activity_id.into(),
            user: String::new(),
            file_type: Self::FILE_TYPE.to_string(),
            timestamp: timestamp.into(),
            date_extracted: extraction_timestamp(),
        }
    }
}
