//! Administration timestamp normalization
//!
//! Several tasks of one visit finish at different times on the same day, so
//! grouping uses the UTC calendar date only. Timestamps without an offset
//! are read as UTC.

use crate::types::TIMESTAMP_COLUMNS;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use nihtb_common::Table;

/// Timestamp formats carrying an explicit UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Timestamp formats without an offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only formats
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Output date format (MM/DD/YYYY)
pub const OUTPUT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Picks the timestamp column and collapses timestamps to dates
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    candidates: Vec<String>,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::with_candidates(TIMESTAMP_COLUMNS.iter().map(|c| c.to_string()).collect())
    }
}

impl DateNormalizer {
    /// Normalizer trying `candidates` in order
    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// First candidate column present in `table`
    pub fn select_column(&self, table: &Table) -> Option<String> {
        self.candidates
            .iter()
            .find(|c| table.has_column(c))
            .cloned()
    }

    /// Parse a timestamp into UTC; `None` if unparseable
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
            }
        }

        None
    }

    /// Calendar day (UTC) of a timestamp
    pub fn normalize(raw: &str) -> Option<NaiveDate> {
        Self::parse_timestamp(raw).map(|dt| dt.date_naive())
    }
}

/// Format a visit date for output
pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_times_collapse() {
        let a = DateNormalizer::normalize("2024-03-05 09:15:00");
        let b = DateNormalizer::normalize("2024-03-05 16:47:31.250");
        assert_eq!(a, Some(ymd(2024, 3, 5)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_offset_converted_to_utc_day() {
        // 21:30 at UTC-05:00 is 02:30 the next day in UTC
        assert_eq!(
            DateNormalizer::normalize("2024-03-05T21:30:00-05:00"),
            Some(ymd(2024, 3, 6))
        );
        assert_eq!(
            DateNormalizer::normalize("2024-03-05 21:30:00 -0500"),
            Some(ymd(2024, 3, 6))
        );
    }

    #[test]
    fn test_us_formats() {
        assert_eq!(DateNormalizer::normalize("3/5/2024 2:04:09 PM"), Some(ymd(2024, 3, 5)));
        assert_eq!(DateNormalizer::normalize("03/05/2024 14:04"), Some(ymd(2024, 3, 5)));
        assert_eq!(DateNormalizer::normalize("03/05/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(DateNormalizer::normalize("2024-03-05"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn test_unparseable_is_missing() {
        assert_eq!(DateNormalizer::normalize("not a date"), None);
        assert_eq!(DateNormalizer::normalize(""), None);
        assert_eq!(DateNormalizer::normalize("2024-13-45"), None);
    }

    #[test]
    fn test_select_column_preference() {
        let both = Table::new(vec!["ResponseDate".into(), "DateFinished".into()]);
        let fallback = Table::new(vec!["PID".into(), "ResponseDate".into()]);
        let none = Table::new(vec!["PID".into()]);

        let normalizer = DateNormalizer::default();
        assert_eq!(normalizer.select_column(&both).as_deref(), Some("DateFinished"));
        assert_eq!(normalizer.select_column(&fallback).as_deref(), Some("ResponseDate"));
        assert_eq!(normalizer.select_column(&none), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(ymd(2024, 3, 5)), "03/05/2024");
    }
}
