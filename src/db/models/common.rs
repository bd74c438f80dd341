//! Common helpers shared across models.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Current time in the fixed-width RFC 3339 form every table stores.
///
/// Fixed precision keeps lexicographic `ORDER BY` consistent with time order.
pub fn timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored or client-supplied timestamp.
///
/// Accepts RFC 3339 and zone-less ISO local date-times (treated as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
