//! Date bounds for the `start_date` / `end_date` query parameters.
//!
//! Every endpoint accepts either a bare calendar day (`2024-02-19`) or a full
//! RFC3339 timestamp (`2024-02-19T15:30:00Z`). A [`DateBound`] keeps the
//! caller's raw string next to its parsed value: the calendar, Gmail and
//! Drive queries need real instants, while the chat filter compares the raw
//! string against message timestamps byte-for-byte.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use thiserror::Error;

/// Format accepted for day-only bounds.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Errors produced while parsing a date bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The input is neither `YYYY-MM-DD` nor an RFC3339 timestamp.
    #[error("Invalid date format: {input}. Use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ")]
    Invalid { input: String },

    /// The start bound lies after the end bound.
    #[error("start_date {start} is after end_date {end}")]
    Reversed { start: String, end: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundKind {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

/// A single parsed date bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBound {
    raw: String,
    kind: BoundKind,
}

impl DateBound {
    /// Parses a bound from `YYYY-MM-DD` or an ISO-8601/RFC3339 timestamp.
    ///
    /// Timestamps without an offset are taken as UTC.
    pub fn parse(input: &str) -> Result<Self, DateError> {
        let trimmed = input.trim();
        let invalid = || DateError::Invalid {
            input: input.to_string(),
        };

        let kind = if trimmed.contains('T') {
            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                BoundKind::Instant(dt.with_timezone(&Utc))
            } else {
                let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(|_| invalid())?;
                BoundKind::Instant(naive.and_utc())
            }
        } else {
            BoundKind::Day(NaiveDate::parse_from_str(trimmed, DAY_FORMAT).map_err(|_| invalid())?)
        };

        Ok(Self {
            raw: trimmed.to_string(),
            kind,
        })
    }

    /// The string the caller supplied (whitespace-trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The earliest instant covered by this bound.
    ///
    /// A day bound starts at midnight UTC; an instant is returned unchanged.
    pub fn start_of_range(&self) -> DateTime<Utc> {
        match self.kind {
            BoundKind::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
            BoundKind::Instant(dt) => dt,
        }
    }

    /// The latest instant covered by this bound.
    ///
    /// A day bound ends at `23:59:59.999999` UTC; an instant is returned unchanged.
    pub fn end_of_range(&self) -> DateTime<Utc> {
        match self.kind {
            BoundKind::Day(day) => day
                .and_hms_micro_opt(23, 59, 59, 999_999)
                .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
                .and_utc(),
            BoundKind::Instant(dt) => dt,
        }
    }
}

/// An optional start/end pair as received from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateBound>,
    pub end: Option<DateBound>,
}

impl DateRange {
    /// A range with no bounds at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parses both optional bounds. Empty strings count as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DateError> {
        let parse_opt = |value: Option<&str>| {
            value
                .filter(|s| !s.trim().is_empty())
                .map(DateBound::parse)
                .transpose()
        };

        let range = Self {
            start: parse_opt(start)?,
            end: parse_opt(end)?,
        };

        if let (Some(start), Some(end)) = (&range.start, &range.end)
            && start.start_of_range() > end.end_of_range()
        {
            return Err(DateError::Reversed {
                start: start.raw().to_string(),
                end: end.raw().to_string(),
            });
        }

        Ok(range)
    }

    /// Raw start string, if any.
    pub fn start_raw(&self) -> Option<&str> {
        self.start.as_ref().map(DateBound::raw)
    }

    /// Raw end string, if any.
    pub fn end_raw(&self) -> Option<&str> {
        self.end.as_ref().map(DateBound::raw)
    }
}

/// The calendar-day prefix of a timestamp: everything before the first `T`.
///
/// Timestamps without a `T` are returned whole.
pub fn date_prefix(timestamp: &str) -> &str {
    timestamp
        .split_once('T')
        .map_or(timestamp, |(day, _)| day)
}

/// Lexicographic `date_prefix(timestamp) >= bound`.
///
/// Only meaningful because `YYYY-MM-DD` sorts the same as a string and as a
/// date. Any other representation compares silently wrong.
pub fn is_on_or_after(timestamp: &str, bound: &str) -> bool {
    date_prefix(timestamp) >= bound
}

/// Lexicographic `date_prefix(timestamp) <= bound`.
pub fn is_on_or_before(timestamp: &str, bound: &str) -> bool {
    date_prefix(timestamp) <= bound
}

/// Wall-clock time used for the `Date_Extracted` field of every record.
pub fn extraction_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    mod bound {
        use super::*;

        #[test]
        fn parses_day() {
            let bound = DateBound::parse("2024-02-19").unwrap();
            assert_eq!(bound.raw(), "2024-02-19");
            assert_eq!(
                bound.start_of_range(),
                Utc.with_ymd_and_hms(2024, 2, 19, 0, 0, 0).unwrap()
            );
        }

        #[test]
        fn day_end_is_last_microsecond() {
            let bound = DateBound::parse("2024-02-19").unwrap();
            assert_eq!(
                bound.end_of_range().to_rfc3339_opts(SecondsFormat::Micros, true),
                "2024-02-19T23:59:59.999999Z"
            );
        }

        #[test]
        fn parses_zulu_timestamp() {
            let bound = DateBound::parse("2024-02-19T15:30:00Z").unwrap();
            let expected = Utc.with_ymd_and_hms(2024, 2, 19, 15, 30, 0).unwrap();
            assert_eq!(bound.start_of_range(), expected);
            assert_eq!(bound.end_of_range(), expected);
        }

        #[test]
        fn parses_offset_timestamp() {
            let bound = DateBound::parse("2024-02-19T15:30:00+02:00").unwrap();
            assert_eq!(
                bound.start_of_range(),
                Utc.with_ymd_and_hms(2024, 2, 19, 13, 30, 0).unwrap()
            );
        }

        #[test]
        fn naive_timestamp_is_utc() {
            let bound = DateBound::parse("2024-02-19T15:30:00").unwrap();
            assert_eq!(
                bound.start_of_range(),
                Utc.with_ymd_and_hms(2024, 2, 19, 15, 30, 0).unwrap()
            );
        }

        #[test]
        fn rejects_garbage() {
            for input in ["yesterday", "2024/02/19", "2024-13-01", "2024-02-19Tnoon", ""] {
                let err = DateBound::parse(input).unwrap_err();
                assert!(matches!(err, DateError::Invalid { .. }), "{input}");
            }
        }

        #[test]
        fn error_message_names_formats() {
            let err = DateBound::parse("19/02/2024").unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid date format: 19/02/2024. Use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ"
            );
        }
    }

    mod range {
        use super::*;

        #[test]
        fn empty_strings_are_absent() {
            let range = DateRange::parse(Some(""), Some("  ")).unwrap();
            assert_eq!(range, DateRange::unbounded());
        }

        #[test]
        fn keeps_raw_values() {
            let range = DateRange::parse(Some("2024-02-01"), Some("2024-02-28T12:00:00Z")).unwrap();
            assert_eq!(range.start_raw(), Some("2024-02-01"));
            assert_eq!(range.end_raw(), Some("2024-02-28T12:00:00Z"));
        }

        #[test]
        fn same_day_is_valid() {
            assert!(DateRange::parse(Some("2024-02-19"), Some("2024-02-19")).is_ok());
        }

        #[test]
        fn reversed_is_rejected() {
            let err = DateRange::parse(Some("2024-03-01"), Some("2024-02-01")).unwrap_err();
            assert!(matches!(err, DateError::Reversed { .. }));
        }

        #[test]
        fn invalid_end_is_reported() {
            let err = DateRange::parse(Some("2024-03-01"), Some("march")).unwrap_err();
            assert_eq!(
                err,
                DateError::Invalid {
                    input: "march".to_string()
                }
            );
        }
    }

    mod prefix {
        use super::*;

        #[test]
        fn splits_on_first_t() {
            assert_eq!(date_prefix("2023-09-15T14:30:45.123456Z"), "2023-09-15");
            assert_eq!(date_prefix("2023-09-15"), "2023-09-15");
            assert_eq!(date_prefix(""), "");
        }

        #[test]
        fn inclusive_day_bounds() {
            let ts = "2024-02-19T23:59:59.999Z";
            assert!(is_on_or_after(ts, "2024-02-19"));
            assert!(is_on_or_before(ts, "2024-02-19"));
            assert!(!is_on_or_after(ts, "2024-02-20"));
            assert!(!is_on_or_before(ts, "2024-02-18"));
        }

        #[test]
        fn compares_against_full_timestamp_bounds_as_strings() {
            // "2024-02-19" is a prefix of the bound, so it sorts before it.
            assert!(is_on_or_before("2024-02-19T10:00:00Z", "2024-02-19T00:00:00Z"));
            assert!(is_on_or_before("2024-02-19T10:00:00Z", "2024-02-20T00:00:00Z"));
            assert!(!is_on_or_after("2024-02-19T10:00:00Z", "2024-02-19T00:00:00Z"));
        }

        #[test]
        fn empty_timestamp_fails_start_bound() {
            assert!(!is_on_or_after("", "2024-01-01"));
            assert!(is_on_or_before("", "2024-01-01"));
        }
    }

    #[test]
    fn extraction_timestamp_is_rfc3339() {
        let stamp = extraction_timestamp();
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
        assert!(stamp.ends_with('Z'));
    }
}
