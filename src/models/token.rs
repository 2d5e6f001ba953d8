use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroize;

/// The persisted session credential: an opaque bearer token plus its
/// validity window. Single slot: saving a new record replaces the
/// previous one.
///
/// Invariant: a loaded record must be checked against the current time
/// before the token is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at_ms: i64,
    /// Moment the session was established (ISO-8601 on disk).
    pub logged_in_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(token: String, ttl_ms: i64, now: DateTime<Utc>) -> Self {
        TokenRecord {
            token,
            expires_at_ms: now.timestamp_millis() + ttl_ms,
            logged_in_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at_ms
    }

    /// Time left in the validity window, zero if already elapsed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let ms = self.expires_at_ms - now.timestamp_millis();
        Duration::from_millis(ms.max(0) as u64)
    }
}

impl Drop for TokenRecord {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_not_expired() {
        let now = Utc::now();
        let record = TokenRecord::new("abc".into(), 60_000, now);
        assert!(!record.is_expired(now));
        assert_eq!(record.remaining(now), Duration::from_millis(60_000));
    }

    #[test]
    fn test_record_expires_at_boundary() {
        let now = Utc::now();
        let record = TokenRecord::new("abc".into(), 60_000, now);
        let at_expiry = now + chrono::Duration::milliseconds(60_000);
        assert!(record.is_expired(at_expiry));
        assert_eq!(record.remaining(at_expiry), Duration::ZERO);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let now = Utc::now();
        let record = TokenRecord::new("abc".into(), 0, now);
        assert!(record.is_expired(now));
    }

    #[test]
    fn test_serialized_login_time_is_iso8601() {
        let now = Utc::now();
        let record = TokenRecord::new("abc".into(), 1_000, now);
        let json = serde_json::to_value(&record).unwrap();
        let stamp = json["logged_in_at"].as_str().unwrap();
        assert!(stamp.contains('T'));
        let back: TokenRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
