pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::errors::CacheError;
use crate::key::CacheKey;

/// Shared tier behind the process-local snapshot.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;
    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError>;
    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

pub type RemoteHandle = std::sync::Arc<dyn RemoteCache + 'static>;
