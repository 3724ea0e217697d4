//! Calendar date arithmetic on `NaiveDate`.
//!
//! Dates carry no time-of-day and no timezone, so day differences are exact
//! and month offsets never drift across DST or UTC boundaries.

use chrono::{Datelike, NaiveDate};

use crate::error::LoanPayoffError;
use crate::LoanPayoffResult;

/// Parse a `YYYY-MM-DD` literal.
///
/// Returns `None` when a component is missing, non-numeric or zero, or when
/// the day does not exist in the given month (e.g. `2023-02-29`).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().splitn(3, '-');
    let year = parse_component(parts.next()?)?;
    let month = parse_component(parts.next()?)?;
    let day = parse_component(parts.next()?)?;

    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(v) => Some(v),
    }
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Advance a date by whole calendar months, clamping the day to the target
/// month's length (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: i32) -> LoanPayoffResult<NaiveDate> {
    let total_months = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let new_year = i32::try_from(total_months.div_euclid(12)).map_err(|_| {
        LoanPayoffError::DateError(format!(
            "{} + {months} months is outside the supported calendar",
            format_iso(date)
        ))
    })?;
    let new_month = (total_months.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(new_year, new_month));

    NaiveDate::from_ymd_opt(new_year, new_month, day).ok_or_else(|| {
        LoanPayoffError::DateError(format!(
            "{} + {months} months is outside the supported calendar",
            format_iso(date)
        ))
    })
}

/// Whole days from `a` to `b`, floored at zero.
pub fn diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().max(0)
}

/// June 1 of the year containing `today`.
pub fn default_graduation_date(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), 6, 1).unwrap_or(today)
}

/// Number of days in a given month/year.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
