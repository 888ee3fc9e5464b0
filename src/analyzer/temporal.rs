use std::cmp::min;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Resolves a request tag, where `"auto"` (or an empty tag) picks a
    /// granularity from the length of the range.
    pub fn resolve(tag: &str, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if tag.is_empty() || tag == "auto" {
            Ok(auto_granularity(end.signed_duration_since(start).num_days()))
        } else {
            tag.parse()
        }
    }
}

impl FromStr for Granularity {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(invalid(format!("granularité non supportée: {}", other))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determines granularity automatically based on number of days in range.
/// ≤ 14 days → day, < 30 days → week, else → month
pub fn auto_granularity(days: i64) -> Granularity {
    if days <= 14 {
        Granularity::Day
    } else if days < 30 {
        Granularity::Week
    } else {
        Granularity::Month
    }
}

/// An inclusive calendar range; serializes as `{"startDate": "YYYY-MM-DD", "endDate": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateBucket {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateBucket {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// The `YYYY-MM-DD` key chart points are matched against.
    pub fn start_key(&self) -> String {
        self.start_date.format("%Y-%m-%d").to_string()
    }
}

/// Accepts `YYYY-MM-DD` as well as the date-time forms sent by the UI; the
/// time of day is dropped.
pub fn parse_date_flexible(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parses an inclusive `[date_from, date_to]` range, rejecting reversed ranges.
pub fn parse_range(date_from: &str, date_to: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start = parse_date_flexible(date_from)
        .ok_or_else(|| invalid(format!("date de début invalide: {}", date_from)))?;
    let end = parse_date_flexible(date_to)
        .ok_or_else(|| invalid(format!("date de fin invalide: {}", date_to)))?;

    if start > end {
        return Err(invalid(format!(
            "date de début {} postérieure à la date de fin {}",
            start, end
        )));
    }

    Ok((start, end))
}

/// Parses and validates the request, then splits `[date_from, date_to]` into buckets.
pub fn compute_date_buckets(
    granularity: &str,
    date_from: &str,
    date_to: &str,
) -> Result<Vec<DateBucket>> {
    let granularity: Granularity = granularity.parse()?;
    let (start, end) = parse_range(date_from, date_to)?;
    Ok(generate_buckets(granularity, start, end))
}

/// Splits `[start, end]` into contiguous calendar-aligned buckets.
///
/// Only the first and last buckets can be partial: the first one starts at
/// `start`, the last one is cut at `end`. Returns nothing when `start > end`.
pub fn generate_buckets(granularity: Granularity, start: NaiveDate, end: NaiveDate) -> Vec<DateBucket> {
    match granularity {
        Granularity::Day => split_range(start, end, |d| d),
        Granularity::Week => split_range(start, end, end_of_week),
        Granularity::Month => split_range(start, end, end_of_month),
    }
}

fn split_range<F>(start: NaiveDate, end: NaiveDate, period_end: F) -> Vec<DateBucket>
where
    F: Fn(NaiveDate) -> NaiveDate,
{
    let mut result = Vec::new();
    if start > end {
        return result;
    }

    let mut current = start;
    loop {
        let bucket_end = min(period_end(current), end);
        result.push(DateBucket::new(current, bucket_end));

        match bucket_end.succ_opt() {
            Some(next) if next <= end => current = next,
            _ => break,
        }
    }

    result
}

/// The Sunday closing the ISO week of `date`.
fn end_of_week(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - date.weekday().num_days_from_monday() as u64;
    date.checked_add_days(Days::new(days_to_sunday))
        .unwrap_or(NaiveDate::MAX)
}

fn end_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next_first| next_first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn invalid(message: String) -> DashError {
    error!("intervalle de dates: {}", message);
    DashError::InvalidParameter(message)
}
