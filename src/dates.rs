//! Date and time helpers shared by the store, the exports and the CLI.
//!
//! Timestamps are naive local wall-clock values at minute resolution, the shape
//! a `datetime-local` form field produces.

use chrono::{DateTime, Local, NaiveDateTime, Timelike};

/// Canonical persisted shape of a timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

const DISPLAY_FORMAT: &str = "%Y-%m-%d, %-I:%M %p";
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Current local time, truncated to the minute.
pub fn now() -> NaiveDateTime {
    truncate_to_minute(Local::now().naive_local())
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Parse user or file input into a minute-resolution timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM` (with optional seconds), a space instead of the
/// `T`, and RFC 3339 strings, which are converted to local time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in [
        TIMESTAMP_FORMAT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(truncate_to_minute(dt));
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| truncate_to_minute(dt.with_timezone(&Local).naive_local()))
}

/// Render a timestamp in its persisted shape.
pub fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Whole calendar days from `start` to `end`, rounded up and floored at zero.
pub fn duration_in_days(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Like [`duration_in_days`] but on raw input.
///
/// Returns `None` ("unknown") when either side does not parse; callers must
/// leave the duration unset rather than treat that as zero.
pub fn duration_between(start: &str, end: &str) -> Option<u32> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    Some(duration_in_days(start, end))
}

/// Human display form, e.g. `2024-01-01, 9:05 AM`, or `N/A` when absent.
pub fn format_for_display(dt: Option<NaiveDateTime>) -> String {
    match dt {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => "N/A".into(),
    }
}

/// `1 day`, `3 days`, or `-` when the duration is unknown.
pub fn format_duration(days: Option<u32>) -> String {
    match days {
        Some(1) => "1 day".into(),
        Some(n) => format!("{n} days"),
        None => "-".into(),
    }
}

/// Serde adapter persisting timestamps as `YYYY-MM-DDTHH:MM`.
pub mod minute_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_duration_rounds_up_partial_days() {
        assert_eq!(duration_in_days(ts("2024-01-01T10:00"), ts("2024-01-02T09:00")), 1);
        assert_eq!(duration_in_days(ts("2024-01-01T10:00"), ts("2024-01-03T11:00")), 3);
        assert_eq!(duration_in_days(ts("2024-01-01T10:00"), ts("2024-01-02T10:00")), 1);
    }

    #[test]
    fn test_duration_is_zero_when_due_not_after_created() {
        assert_eq!(duration_in_days(ts("2024-01-01T10:00"), ts("2024-01-01T10:00")), 0);
        assert_eq!(duration_in_days(ts("2024-01-05T10:00"), ts("2024-01-01T10:00")), 0);
    }

    #[test]
    fn test_duration_between_unknown_on_bad_input() {
        assert_eq!(duration_between("2024-01-01T10:00", "not a date"), None);
        assert_eq!(duration_between("", "2024-01-01T10:00"), None);
        assert_eq!(duration_between("2024-01-01T10:00", "2024-01-01T12:00"), Some(1));
    }

    #[test]
    fn test_parse_accepts_seconds_and_space_separator() {
        assert_eq!(ts("2024-03-04T05:06:59"), ts("2024-03-04T05:06"));
        assert_eq!(ts("2024-03-04 05:06"), ts("2024-03-04T05:06"));
        assert!(parse_timestamp("2024-13-01T00:00").is_none());
    }

    #[test]
    fn test_display_format() {
        assert_eq!(format_for_display(Some(ts("2024-01-01T09:05"))), "2024-01-01, 9:05 AM");
        assert_eq!(format_for_display(Some(ts("2024-01-01T00:30"))), "2024-01-01, 12:30 AM");
        assert_eq!(format_for_display(Some(ts("2024-01-01T13:00"))), "2024-01-01, 1:00 PM");
        assert_eq!(format_for_display(None), "N/A");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(1)), "1 day");
        assert_eq!(format_duration(Some(0)), "0 days");
        assert_eq!(format_duration(None), "-");
    }
}
