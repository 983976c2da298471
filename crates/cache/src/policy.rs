use std::time::Duration;

pub const DEFAULT_TTL_MS: i64 = 300_000;
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 3_000;

#[derive(Clone, Debug)]
pub struct CachePolicy {
    pub ttl_ms: i64,
    /// Upper bound on one store load; exceeding it counts as the store being unreachable.
    pub load_timeout_ms: u64,
}

impl CachePolicy {
    pub fn with_ttl(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms.max(1);
        self
    }

    pub fn with_load_timeout(mut self, timeout_ms: u64) -> Self {
        self.load_timeout_ms = timeout_ms.max(1);
        self
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}
