//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is a UTC-only instant truncated to seconds. Every timestamp
//! stored on a Filing (created, submitted, verified, fact reported) uses it,
//! so return documents hashed through `CanonicalBytes` are deterministic.
//!
//! Non-UTC inputs are rejected by [`Timestamp::parse`]. Gateway and
//! verification callbacks that send local offsets (IST, `+05:30`) go
//! through [`Timestamp::parse_lenient`], which converts to UTC.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string with a `Z` suffix.
    ///
    /// # Errors
    ///
    /// Rejects malformed strings and any explicit offset, including `+00:00`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::invalid(
                "timestamp",
                format!("must use Z suffix (UTC only), got {s:?}"),
            ));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            ValidationError::invalid("timestamp", format!("invalid RFC 3339 value {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2025-07-31T18:29:59Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_has_no_subseconds() {
        assert!(!Timestamp::now().to_iso8601().contains('.'));
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc
            .with_ymd_and_hms(2025, 7, 31, 18, 29, 59)
            .unwrap()
            .with_nanosecond(999_000_000)
            .unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_iso8601(), "2025-07-31T18:29:59Z");
    }

    #[test]
    fn strict_parse_rejects_offsets() {
        assert!(Timestamp::parse("2025-07-31T23:59:59+05:30").is_err());
        assert!(Timestamp::parse("2025-07-31T18:29:59+00:00").is_err());
        assert!(Timestamp::parse("2025-07-31").is_err());
        assert!(Timestamp::parse("2025-07-31T18:29:59Z").is_ok());
    }

    #[test]
    fn lenient_parse_converts_ist_to_utc() {
        let ts = Timestamp::parse_lenient("2025-07-31T23:59:59+05:30").unwrap();
        assert_eq!(ts.to_iso8601(), "2025-07-31T18:29:59Z");
    }

    #[test]
    fn ordering_and_serde() {
        let a = Timestamp::parse("2025-07-31T18:29:58Z").unwrap();
        let b = Timestamp::parse("2025-07-31T18:29:59Z").unwrap();
        assert!(a < b);
        let json = serde_json::to_string(&b).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
