use serde::{Deserialize, Serialize};
use shared::TtlMs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// A cached value with an absolute expiry, checked lazily on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub stored_at: u64,
    pub expire_at: u64,
}

impl CacheEntry {
    pub fn new(value: serde_json::Value, ttl: TtlMs) -> Self {
        let now = now_timestamp_ms();
        Self {
            value,
            stored_at: now,
            expire_at: now + ttl.0,
        }
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        now_timestamp_ms() >= self.expire_at
    }

    /// Get remaining time to live in milliseconds
    pub fn remaining_ttl_ms(&self) -> u64 {
        let now = now_timestamp_ms();

        if now >= self.expire_at {
            0
        } else {
            self.expire_at - now
        }
    }
}

/// The session user record as the backend returns it. Unknown fields are
/// dropped; `is_admin` is a pass-through claim owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub credits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Entry counts for the two cache tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: u64,
    pub durable_entries: u64,
}
