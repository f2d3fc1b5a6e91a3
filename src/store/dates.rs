//! Date parsing for source rows.
//!
//! Source tables hold dates as `date` columns (`2023-05-01`), `timestamptz`
//! columns rendered as RFC 3339 by PostgREST, or PostgreSQL's text form
//! (`2023-05-01 10:00:00.123+00`) when read over a direct connection.
//! Bare dates are pinned to UTC midnight so the calendar day survives a
//! round trip regardless of the operator's timezone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::AppError;
use crate::store::FieldValue;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a textual date or timestamp, returning `None` if no format matches.
pub fn parse_date_str(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Converts a field value into a UTC timestamp.
///
/// Integers and doubles are Unix epoch milliseconds. Existing timestamps pass
/// through unchanged so normalizing twice is a no-op.
pub fn to_timestamp(field: &str, value: &FieldValue) -> Result<DateTime<Utc>, AppError> {
    let invalid = || AppError::InvalidDate {
        field: field.to_string(),
        value: value.to_json().to_string(),
    };

    match value {
        FieldValue::Timestamp(ts) => Ok(*ts),
        FieldValue::String(s) => parse_date_str(s).ok_or_else(invalid),
        FieldValue::Integer(ms) => DateTime::from_timestamp_millis(*ms).ok_or_else(invalid),
        FieldValue::Double(ms) if ms.is_finite() => {
            DateTime::from_timestamp_millis(*ms as i64).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}
