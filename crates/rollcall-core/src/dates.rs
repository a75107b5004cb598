//! Calendar date handling for query strings.
//!
//! Dates travel in query strings as `dd-mm-yyyy` and are stored as ISO
//! `yyyy-mm-dd` (`DATE` columns). Request bodies use ISO dates directly.

use chrono::NaiveDate;
use thiserror::Error;

pub const QUERY_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date format. Use dd-mm-yyyy")]
    InvalidFormat,
    #[error("start_date must not be after end_date")]
    InvertedRange,
}

/// Parses a `dd-mm-yyyy` query date, rejecting impossible calendar days.
pub fn parse_query_date(input: &str) -> Result<NaiveDate, DateError> {
    let input = input.trim();
    let bytes = input.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'-'
        && bytes[5] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());

    if !shape_ok {
        return Err(DateError::InvalidFormat);
    }

    NaiveDate::parse_from_str(input, QUERY_DATE_FORMAT).map_err(|_| DateError::InvalidFormat)
}

pub fn format_query_date(date: NaiveDate) -> String {
    date.format(QUERY_DATE_FORMAT).to_string()
}

/// Inclusive date range, parsed from optional `start_date` / `end_date` query values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DateError> {
        let start = start
            .filter(|s| !s.trim().is_empty())
            .map(parse_query_date)
            .transpose()?;
        let end = end
            .filter(|s| !s.trim().is_empty())
            .map(parse_query_date)
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return Err(DateError::InvertedRange);
        }

        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_query_date() {
        assert_eq!(parse_query_date("13-05-2024"), Ok(ymd(2024, 5, 13)));
        assert_eq!(parse_query_date(" 01-01-2025 "), Ok(ymd(2025, 1, 1)));
    }

    #[test]
    fn test_parse_query_date_rejects_bad_shapes() {
        for input in ["2024-05-13", "13/05/2024", "1-5-2024", "", "aa-bb-cccc", "13-05-24"] {
            assert_eq!(parse_query_date(input), Err(DateError::InvalidFormat), "{input}");
        }
    }

    #[test]
    fn test_parse_query_date_rejects_impossible_days() {
        assert_eq!(parse_query_date("31-02-2024"), Err(DateError::InvalidFormat));
        assert_eq!(parse_query_date("00-01-2024"), Err(DateError::InvalidFormat));
        assert_eq!(parse_query_date("29-02-2024"), Ok(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_format_round_trips_display_form() {
        assert_eq!(format_query_date(ymd(2024, 5, 3)), "03-05-2024");
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::parse(Some("01-05-2024"), Some("31-05-2024")).unwrap();
        assert!(range.contains(ymd(2024, 5, 1)));
        assert!(range.contains(ymd(2024, 5, 31)));
        assert!(!range.contains(ymd(2024, 6, 1)));

        let open = DateRange::parse(None, Some("")).unwrap();
        assert!(open.contains(ymd(1999, 1, 1)));

        assert_eq!(
            DateRange::parse(Some("02-05-2024"), Some("01-05-2024")),
            Err(DateError::InvertedRange)
        );
    }
}
