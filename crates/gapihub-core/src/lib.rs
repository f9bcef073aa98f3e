//! Core types: normalized records, date bounds, tracing setup.

pub mod date;
pub mod record;
pub mod tracing;

pub use date::{DateBound, DateError, DateRange, date_prefix, is_on_or_after, is_on_or_before};
pub use record::{
    CARD_PLACEHOLDER, ChatRecord, DocActivityRecord, EmailRecord, EventRecord, MeetingType,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
