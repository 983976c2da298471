use bytes::Bytes;
use chrono::Utc;

/// Encoded snapshot as held by a shared backend.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: Bytes,
    pub stored_at_ms: i64,
    pub ttl_ms: i64,
}

impl CacheEntry {
    pub fn new(value: Bytes, ttl_ms: i64) -> Self {
        Self::with_parts(value, Utc::now().timestamp_millis(), ttl_ms)
    }

    pub fn with_parts(value: Bytes, stored_at_ms: i64, ttl_ms: i64) -> Self {
        Self {
            value,
            stored_at_ms,
            ttl_ms,
        }
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        fresh(self.stored_at_ms, self.ttl_ms, now_ms)
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.stored_at_ms.saturating_add(self.ttl_ms)
    }
}

pub(crate) fn fresh(stored_at_ms: i64, ttl_ms: i64, now_ms: i64) -> bool {
    now_ms < stored_at_ms.saturating_add(ttl_ms)
}
