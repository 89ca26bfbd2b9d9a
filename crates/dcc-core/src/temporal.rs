//! # Date Resolution
//!
//! Resolves the timestamp strings found in access-token conditions and in
//! credential payloads to UTC instants.
//!
//! Two entry points with different strictness:
//!
//! - [`parse_condition_instant()`]: conditions must carry an explicit
//!   offset (`2021-06-01T10:00:00+02:00`, `2021-06-01T08:00:00Z`). A value
//!   that does not parse is a caller error.
//! - [`resolve_instant()`]: credential dates are resolved leniently with a
//!   format fallback: zoned date-time, then local date-time read as UTC, then
//!   a bare date at UTC midnight. Anything else resolves to `None` and the
//!   comparison that needed it is skipped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::DccError;

/// Parse a zoned date-time, accepting RFC 3339 and the minute-precision
/// form (`2021-06-01T10:00Z`).
fn parse_zoned(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => {
            let normalized = match value.strip_suffix('Z') {
                Some(head) => format!("{head}+00:00"),
                None => value.to_string(),
            };
            DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z")
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| rfc_err)
        }
    }
}

/// Parse a local (offset-free) date-time.
fn parse_local(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// Parse a condition timestamp that must carry a zone offset.
///
/// # Errors
///
/// Returns [`DccError::InvalidCondition`] naming `field` if the value is not
/// a zoned ISO 8601 date-time.
pub fn parse_condition_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, DccError> {
    parse_zoned(value.trim()).map_err(|e| DccError::InvalidCondition {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a credential date string to a UTC instant.
///
/// Tries, in order: zoned date-time (normalized to UTC), local date-time
/// interpreted as UTC, and date-only at the start of the UTC day.
pub fn resolve_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = parse_zoned(value) {
        return Some(dt);
    }
    if let Some(local) = parse_local(value) {
        return Some(local.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}
