pub mod backend;
pub mod codec;
pub mod config;
pub mod entry;
pub mod errors;
pub mod key;
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod snapshot;

#[cfg(feature = "redis")]
pub use backend::redis::RedisBackend;
pub use backend::{memory::MemoryBackend, RemoteCache, RemoteHandle};
pub use codec::{Codec, JsonCodec};
#[cfg(feature = "redis")]
pub use config::RedisConfig;
pub use entry::CacheEntry;
pub use errors::CacheError;
pub use key::{CacheKey, ACCESS_RULES_KEY, URL_MAPPINGS_KEY};
pub use metrics::{SimpleStats, StatsSnapshot};
pub use policy::CachePolicy;
pub use snapshot::{
    mapping_cache, rule_cache, CachedRecord, EntryInfo, MappingCache, RuleCache, Snapshot,
    SnapshotCache, SnapshotOrigin, StoreHandle,
};
