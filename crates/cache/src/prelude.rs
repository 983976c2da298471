pub use crate::backend::{memory::MemoryBackend, RemoteCache, RemoteHandle};
pub use crate::codec::{Codec, JsonCodec};
pub use crate::entry::CacheEntry;
pub use crate::errors::CacheError;
pub use crate::key::CacheKey;
pub use crate::metrics::{SimpleStats, StatsSnapshot};
pub use crate::policy::CachePolicy;
pub use crate::snapshot::{
    mapping_cache, rule_cache, MappingCache, RuleCache, Snapshot, SnapshotCache, SnapshotOrigin,
    StoreHandle,
};
