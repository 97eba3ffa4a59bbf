//! Cell coercion: messy text to numbers, plus the strict parsers used to
//! classify a line chart's x axis.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::data::Value;

/// Characters removed outright before the generic filter runs.
const STRIPPED_SYMBOLS: [char; 4] = ['$', '₹', ',', '%'];

/// Coerce one cell to a number.
///
/// Native numbers pass through (NaN counts as missing); text goes through
/// [`coerce_text`].
pub fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Missing => None,
        Value::Number(n) if n.is_nan() => None,
        Value::Number(n) => Some(*n),
        Value::Text(s) => coerce_text(s),
    }
}

/// Best-effort conversion of formatted text such as `"$1,234.50"`,
/// `"(123)"` or `"12%"` into a number.
pub fn coerce_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();

    // (123) => -123
    let signed: String = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => format!("-{}", inner),
        None => trimmed.to_string(),
    };

    let cleaned: String = signed
        .chars()
        .filter(|c| !STRIPPED_SYMBOLS.contains(c))
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    // The whole remainder must parse; "-12-3" is rejected rather than
    // truncated to a prefix.
    cleaned.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Strict numeric parse, no cleanup: `"12"` and `"1e3"` parse, `"$12"` does not.
pub fn parse_plain_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Strict numeric view of a cell.
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Missing => None,
        Value::Number(n) if n.is_nan() => None,
        Value::Number(n) => Some(*n),
        Value::Text(s) => parse_plain_number(s),
    }
}

/// Date/time view of a cell. Only text cells are considered; bare numbers
/// are never read as timestamps.
pub fn value_as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Text(s) => parse_datetime(s),
        _ => None,
    }
}

const DATETIME_FORMATS: [&str; 14] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// Month-first before day-first, so "01/02/2023" is January 2nd.
const DATE_FORMATS: [&str; 13] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y-%b-%d",
];

/// Parse the common date and date-time spellings found in spreadsheets.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for fmt in &DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    for fmt in &DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // YYYY-MM
    if value.len() == 7 && value.as_bytes()[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Format used for temporal axis labels.
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
