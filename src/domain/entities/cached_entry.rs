use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached response value. An entry whose `expires_at` has passed is
/// logically absent: reads purge it and return nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedEntry {
    pub fn new(
        key: String,
        value: serde_json::Value,
        now: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key,
            value,
            timestamp: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}
