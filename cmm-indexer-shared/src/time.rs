//! Parsing of repository supplied timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse an ISO-8601 timestamp as sent by OAI-PMH repositories.
///
/// Accepts full RFC 3339 instants, date-times without offset (read as UTC)
/// and plain dates (midnight UTC). Anything else yields `None`.
pub fn parse_iso_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
