//! Lenient cell parsers.
//!
//! Every parser here maps bad input to `None`; none of them can fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Tokens read as missing, on top of blank cells.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A", "#NA",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Whether a cell is a missing-value token.
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NA_TOKENS.contains(&cell)
}

/// Trimmed text, or `None` for blank and missing-value tokens.
pub fn clean_text(cell: Option<&str>) -> Option<String> {
    cell.filter(|c| !is_missing(c)).map(|c| c.trim().to_string())
}

/// Parse a calendar date in any of the accepted shapes.
///
/// Calendar-invalid input such as `1995-13-99` yields `None`.
pub fn parse_date(cell: Option<&str>) -> Option<NaiveDate> {
    let cell = cell?.trim();
    if is_missing(cell) {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
    {
        return Some(date);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
    {
        return Some(dt.date());
    }

    DateTime::parse_from_rfc3339(cell)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a head count.
///
/// Integers and integral floats (`"12.0"`) are accepted; anything
/// fractional, non-finite or non-numeric is missing.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_count(cell: Option<&str>) -> Option<i64> {
    let cell = cell?.trim();
    if is_missing(cell) {
        return None;
    }
    if let Ok(value) = cell.parse::<i64>() {
        return Some(value);
    }

    let value = cell.parse::<f64>().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}
