// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar arithmetic.

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

use crate::error::{AppError, Result};

/// Source of "today". Services take one so tests can pin the date.
pub type Clock = fn() -> NaiveDate;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by [`format_utc_rfc3339`].
pub fn parse_utc_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid stored timestamp {:?}: {}", raw, e)))
}

/// Current calendar day in UTC; the day key for new submissions.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a strict `YYYY-MM-DD` day key.
pub fn parse_day_key(raw: &str) -> Result<NaiveDate> {
    let well_formed = raw.len() == 10
        && raw
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });

    if !well_formed {
        return Err(AppError::Validation(
            "Invalid date format. Use YYYY-MM-DD".to_string(),
        ));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid calendar date: {}", raw)))
}

/// First and last day of a month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1970..=9999).contains(&year) {
        return Err(AppError::Validation(format!("Year out of range: {}", year)));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Month out of range: {}", month)))?;

    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    let last = next_month
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::Validation(format!("Month out of range: {}", month)))?;

    debug_assert_eq!(last.month(), month);
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds_handles_leap_february() {
        let (first, last) = month_bounds(2028, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
    }

    #[test]
    fn test_month_bounds_december() {
        let (_, last) = month_bounds(2026, 12).unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }

    #[test]
    fn test_month_bounds_rejects_bad_month() {
        assert!(matches!(month_bounds(2026, 13), Err(AppError::Validation(_))));
        assert!(matches!(month_bounds(2026, 0), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_day_key_is_strict() {
        assert!(parse_day_key("2026-03-09").is_ok());
        assert!(matches!(parse_day_key("2026-3-9"), Err(AppError::Validation(_))));
        assert!(matches!(parse_day_key("2026-02-30"), Err(AppError::Validation(_))));
        assert!(matches!(parse_day_key("not-a-date"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_timestamp_round_trip_keeps_micros() {
        let now = Utc::now();
        let parsed = parse_utc_rfc3339(&format_utc_rfc3339(now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }
}
