//! Timestamp utilities
//!
//! All timestamps are stored as RFC 3339 UTC text with second precision
//! (`2025-03-01T20:00:00Z`) so that lexical order equals chronological order.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", s, e)))
}

/// Convert Unix epoch seconds to a timestamp
pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_format_is_utc_seconds() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(to_db(&ts), "2025-03-01T20:00:00Z");
    }

    #[test]
    fn test_db_round_trip_with_offset_input() {
        let parsed = from_db("2025-03-01T17:00:00-03:00").unwrap();
        assert_eq!(to_db(&parsed), "2025-03-01T20:00:00Z");
    }

    #[test]
    fn test_invalid_stored_timestamp() {
        assert!(from_db("yesterday").is_err());
    }

    #[test]
    fn test_from_unix_seconds() {
        let ts = from_unix_seconds(1_740_859_200).unwrap();
        assert_eq!(to_db(&ts), "2025-03-01T20:00:00Z");
    }
}
