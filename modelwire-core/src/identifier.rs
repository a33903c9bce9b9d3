//! Timestamp helpers.

use chrono::{DateTime, TimeZone, Utc};

/// Get the current UTC timestamp.
///
/// # Example
///
/// ```rust
/// use modelwire_core::identifier::now_utc;
///
/// let timestamp = now_utc();
/// println!("Current time: {}", timestamp);
/// ```
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a provider-supplied unix timestamp (seconds) to UTC.
///
/// Falls back to [`now_utc`] if the value is out of range.
#[must_use]
pub fn from_unix_seconds(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(now_utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc() {
        let before = Utc::now();
        let now = now_utc();
        assert!(now >= before);
    }

    #[test]
    fn test_from_unix_seconds() {
        let ts = from_unix_seconds(1_704_067_200);
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
