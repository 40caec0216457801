//! Inclusive reporting date ranges.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("{field} must be a YYYY-MM-DD date, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("startDate {start} is after endDate {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("range_days must be at least 1")]
    Empty,
    #[error("{field} must fall between 2000-01-01 and 9999-12-31, got {value}")]
    OutOfBounds { field: &'static str, value: NaiveDate },
}

/// An inclusive `[start, end]` range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::Inverted`] when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses `startDate` / `endDate` request values.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::InvalidDate`] for values that are not
    /// `YYYY-MM-DD`, [`DateRangeError::OutOfBounds`] for years outside
    /// 2000..=9999, or [`DateRangeError::Inverted`] when start is after end.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let start = parse_date("startDate", start)?;
        let end = parse_date("endDate", end)?;
        Self::new(start, end)
    }

    /// The `days` days ending the day before `today`.
    ///
    /// Search Console data for the current day is incomplete, so rolling
    /// windows stop at yesterday.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::Empty`] when `days` is zero, or
    /// [`DateRangeError::OutOfBounds`] when the window leaves the calendar.
    pub fn trailing(days: u32, today: NaiveDate) -> Result<Self, DateRangeError> {
        if days == 0 {
            return Err(DateRangeError::Empty);
        }
        let end = sub_days("endDate", today, 1)?;
        let start = sub_days("startDate", end, u64::from(days - 1))?;
        Ok(Self { start, end })
    }

    /// Number of days covered, inclusive of both ends.
    #[must_use]
    pub fn len_days(&self) -> u64 {
        // start <= end is enforced by every constructor
        u64::try_from((self.end - self.start).num_days()).unwrap_or(0) + 1
    }

    /// The equally long range ending the day before `start`.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::OutOfBounds`] when the previous period would
    /// start before the earliest representable date.
    pub fn previous_period(&self) -> Result<Self, DateRangeError> {
        let end = sub_days("startDate", self.start, 1)?;
        let start = sub_days("startDate", end, self.len_days() - 1)?;
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    #[must_use]
    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, DateRangeError> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        DateRangeError::InvalidDate {
            field,
            value: raw.to_string(),
        }
    })?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(DateRangeError::OutOfBounds { field, value: date });
    }
    Ok(date)
}

fn sub_days(
    field: &'static str,
    date: NaiveDate,
    days: u64,
) -> Result<NaiveDate, DateRangeError> {
    date.checked_sub_days(Days::new(days))
        .ok_or(DateRangeError::OutOfBounds { field, value: date })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn parse_accepts_iso_dates() {
        let range = DateRange::parse("2024-03-01", "2024-03-28").unwrap();
        assert_eq!(range.start, date("2024-03-01"));
        assert_eq!(range.end, date("2024-03-28"));
        assert_eq!(range.len_days(), 28);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = DateRange::parse("03/01/2024", "2024-03-28").unwrap_err();
        assert!(matches!(err, DateRangeError::InvalidDate { field: "startDate", .. }));
    }

    #[test]
    fn parse_rejects_inverted_range() {
        let err = DateRange::parse("2024-03-10", "2024-03-01").unwrap_err();
        assert!(matches!(err, DateRangeError::Inverted { .. }));
    }

    #[test]
    fn single_day_range_has_length_one() {
        let range = DateRange::parse("2024-03-01", "2024-03-01").unwrap();
        assert_eq!(range.len_days(), 1);
    }

    #[test]
    fn previous_period_is_adjacent_and_equally_long() {
        let range = DateRange::parse("2024-03-01", "2024-03-28").unwrap();
        let prev = range.previous_period().unwrap();
        assert_eq!(prev.end, date("2024-02-29"));
        assert_eq!(prev.start, date("2024-02-02"));
        assert_eq!(prev.len_days(), range.len_days());
    }

    #[test]
    fn trailing_window_ends_yesterday() {
        let range = DateRange::trailing(7, date("2024-03-10")).unwrap();
        assert_eq!(range.end, date("2024-03-09"));
        assert_eq!(range.start, date("2024-03-03"));
        assert_eq!(range.len_days(), 7);
    }

    #[test]
    fn trailing_rejects_zero_days() {
        assert_eq!(
            DateRange::trailing(0, date("2024-03-10")),
            Err(DateRangeError::Empty)
        );
    }

    #[test]
    fn parse_rejects_years_outside_the_supported_window() {
        for (start, end) in [
            ("-100000-01-01", "2024-01-01"),
            ("0000-01-01", "2024-01-01"),
            ("-0001-01-01", "2024-01-01"),
            ("1999-12-31", "2024-01-01"),
            ("2024-01-01", "+100000-01-01"),
        ] {
            let err = DateRange::parse(start, end).unwrap_err();
            assert!(
                matches!(
                    err,
                    DateRangeError::OutOfBounds { .. } | DateRangeError::InvalidDate { .. }
                ),
                "{start}..{end} gave {err:?}"
            );
        }
        assert!(DateRange::parse("2000-01-01", "9999-12-31").is_ok());
    }

    #[test]
    fn previous_period_of_widest_range_does_not_panic() {
        let range = DateRange::parse("2000-01-01", "9999-12-31").unwrap();
        let prev = range.previous_period().unwrap();
        assert_eq!(prev.end, date("1999-12-31"));
        assert_eq!(prev.len_days(), range.len_days());
    }

    #[test]
    fn previous_period_reports_underflow() {
        let range = DateRange::new(NaiveDate::MIN, date("2024-01-01")).unwrap();
        assert!(matches!(
            range.previous_period(),
            Err(DateRangeError::OutOfBounds { field: "startDate", .. })
        ));
    }

    #[test]
    fn trailing_reports_underflow() {
        assert!(matches!(
            DateRange::trailing(5, NaiveDate::MIN),
            Err(DateRangeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn formats_dates_for_the_api() {
        let range = DateRange::parse("2024-01-05", "2024-01-09").unwrap();
        assert_eq!(range.start_str(), "2024-01-05");
        assert_eq!(range.end_str(), "2024-01-09");
    }
}
