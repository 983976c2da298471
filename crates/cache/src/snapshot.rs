use std::sync::Arc;
use std::time::Duration;

use admission_core_types::{AccessRule, UrlMapping};
use admission_store::model::{enabled_in_order, Record};
use admission_store::Repository;
use arc_swap::ArcSwapOption;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::backend::RemoteHandle;
use crate::codec::{Codec, JsonCodec};
use crate::entry::CacheEntry;
use crate::errors::CacheError;
use crate::key::CacheKey;
use crate::metrics::SimpleStats;
use crate::policy::CachePolicy;

/// Records that can be held in a snapshot cache.
pub trait CachedRecord: Record + Serialize + DeserializeOwned {}

impl<T: Record + Serialize + DeserializeOwned> CachedRecord for T {}

pub type StoreHandle<E> = Arc<dyn Repository<E>>;

/// Where the items of a [`Snapshot`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// A fresh entry from either tier.
    Cached,
    /// Loaded from the store by this read.
    Loaded,
    /// The store could not be reached and no fresh entry existed; items are empty.
    Degraded,
}

#[derive(Clone, Debug)]
pub struct Snapshot<E> {
    pub items: Arc<Vec<E>>,
    pub origin: SnapshotOrigin,
}

impl<E> Snapshot<E> {
    fn new(items: Arc<Vec<E>>, origin: SnapshotOrigin) -> Self {
        Self { items, origin }
    }

    pub fn is_degraded(&self) -> bool {
        self.origin == SnapshotOrigin::Degraded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub count: usize,
    pub stored_at_ms: i64,
    pub expires_at_ms: i64,
    pub fresh: bool,
}

/// Local entry. Freshness is judged on the monotonic clock; the epoch fields are for display
/// and for the shared tier.
struct Published<E> {
    items: Arc<Vec<E>>,
    stored_at_ms: i64,
    ttl_ms: i64,
    expires_at: Instant,
}

impl<E> Published<E> {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn deadline_in(ms: i64) -> Instant {
    Instant::now() + Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

/// Read-through cache holding one whole, ordered record set under a single key.
///
/// The process-local tier is an atomically swapped snapshot, so readers see either the old or
/// the new list and never a partial one. An optional shared tier keeps the encoded set for
/// other gateway instances. Store loads run on a detached task under the policy's timeout, so a
/// caller that goes away does not abort a refresh already under way.
#[derive(Clone)]
pub struct SnapshotCache<E, C = JsonCodec>
where
    E: CachedRecord,
    C: Codec + Clone,
{
    key: CacheKey,
    local: Arc<ArcSwapOption<Published<E>>>,
    remote: Option<RemoteHandle>,
    store: StoreHandle<E>,
    codec: C,
    stats: SimpleStats,
    policy: CachePolicy,
}

impl<E: CachedRecord> SnapshotCache<E, JsonCodec> {
    pub fn new(key: CacheKey, store: StoreHandle<E>) -> Self {
        Self::with_codec(key, store, JsonCodec)
    }
}

impl<E, C> SnapshotCache<E, C>
where
    E: CachedRecord,
    C: Codec + Clone,
{
    pub fn with_codec(key: CacheKey, store: StoreHandle<E>, codec: C) -> Self {
        Self {
            key,
            local: Arc::new(ArcSwapOption::empty()),
            remote: None,
            store,
            codec,
            stats: SimpleStats::default(),
            policy: CachePolicy::default(),
        }
    }

    pub fn with_remote(mut self, remote: RemoteHandle) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stats(mut self, stats: SimpleStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn stats(&self) -> &SimpleStats {
        &self.stats
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Describes the process-local entry without touching either backend.
    pub fn entry_info(&self) -> Option<EntryInfo> {
        let published = self.local.load_full()?;
        Some(EntryInfo {
            key: self.key.to_string(),
            count: published.items.len(),
            stored_at_ms: published.stored_at_ms,
            expires_at_ms: published.stored_at_ms.saturating_add(published.ttl_ms),
            fresh: published.is_fresh(),
        })
    }

    fn publish(&self, items: Arc<Vec<E>>, stored_at_ms: i64, ttl_ms: i64, expires_at: Instant) {
        self.local.store(Some(Arc::new(Published {
            items,
            stored_at_ms,
            ttl_ms,
            expires_at,
        })));
    }
}

impl<E, C> SnapshotCache<E, C>
where
    E: CachedRecord,
    C: Codec + Clone + Send + Sync + 'static,
{
    /// Returns the current ordered set, loading it from the store on a miss.
    pub async fn get(&self) -> Snapshot<E> {
        if let Some(published) = self.local.load_full() {
            if published.is_fresh() {
                self.stats.record_hit();
                return Snapshot::new(published.items.clone(), SnapshotOrigin::Cached);
            }
        }
        if let Some(items) = self.fetch_remote(now_ms()).await {
            self.stats.record_hit();
            return Snapshot::new(items, SnapshotOrigin::Cached);
        }

        self.stats.record_miss();
        match self.try_refresh().await {
            Ok(items) => Snapshot::new(items, SnapshotOrigin::Loaded),
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "cache miss and store unavailable, serving empty set");
                Snapshot::new(Arc::new(Vec::new()), SnapshotOrigin::Degraded)
            }
        }
    }

    /// Reloads from the store. On failure logs, returns an empty set and keeps the prior entry.
    pub async fn refresh(&self) -> Arc<Vec<E>> {
        match self.try_refresh().await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "cache refresh failed, keeping previous entry");
                Arc::new(Vec::new())
            }
        }
    }

    /// Reloads from the store and propagates the failure.
    pub async fn try_refresh(&self) -> Result<Arc<Vec<E>>, CacheError> {
        let cache = self.clone();
        let task = tokio::spawn(async move { cache.load_and_publish().await });
        task.await.map_err(|err| {
            CacheError::unknown(&format!("refresh task for {} failed: {err}", self.key))
        })?
    }

    /// Drops the entry from both tiers; the next read goes to the store.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        self.local.store(None);
        if let Some(remote) = &self.remote {
            remote.remove(&self.key).await?;
        }
        tracing::info!(key = %self.key, "cache entry invalidated");
        Ok(())
    }

    async fn fetch_remote(&self, now: i64) -> Option<Arc<Vec<E>>> {
        let remote = self.remote.as_ref()?;
        let entry = match remote.get(&self.key).await {
            Ok(Some(entry)) if entry.is_fresh(now) => entry,
            Ok(_) => return None,
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(key = %self.key, %err, "shared cache read failed, loading from store");
                return None;
            }
        };
        match self.codec.decode::<Vec<E>>(&entry.value) {
            Ok(items) => {
                let items = Arc::new(enabled_in_order(items));
                let remaining = entry.expires_at_ms().saturating_sub(now);
                self.publish(items.clone(), entry.stored_at_ms, entry.ttl_ms, deadline_in(remaining));
                Some(items)
            }
            Err(err) => {
                self.stats.record_error();
                tracing::warn!(key = %self.key, %err, "discarding undecodable shared entry");
                None
            }
        }
    }

    async fn load_and_publish(&self) -> Result<Arc<Vec<E>>, CacheError> {
        self.stats.record_load();
        let started_at = Instant::now();
        let loaded =
            match tokio::time::timeout(self.policy.load_timeout(), self.store.list_enabled()).await
            {
                Ok(Ok(items)) => items,
                Ok(Err(err)) => {
                    self.stats.record_error();
                    return Err(err.into());
                }
                Err(_) => {
                    self.stats.record_error();
                    return Err(CacheError::load_timeout(E::TABLE, self.policy.load_timeout_ms));
                }
            };

        let items = Arc::new(enabled_in_order(loaded));
        let stored_at_ms = now_ms();
        let ttl_ms = self.policy.ttl_ms;
        self.publish(items.clone(), stored_at_ms, ttl_ms, deadline_in(ttl_ms));

        if let Some(remote) = &self.remote {
            let written = match self.codec.encode(items.as_ref()) {
                Ok(bytes) => {
                    remote
                        .set(&self.key, CacheEntry::with_parts(bytes, stored_at_ms, ttl_ms))
                        .await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                self.stats.record_error();
                tracing::warn!(key = %self.key, %err, "shared cache write failed");
            }
        }

        let duration_ms = started_at.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
        self.stats.observe_load_time(duration_ms);
        tracing::debug!(key = %self.key, count = items.len(), duration_ms, "snapshot published");
        Ok(items)
    }
}

pub type RuleCache = SnapshotCache<AccessRule>;
pub type MappingCache = SnapshotCache<UrlMapping>;

pub fn rule_cache(store: StoreHandle<AccessRule>) -> RuleCache {
    SnapshotCache::new(CacheKey::access_rules(), store)
}

pub fn mapping_cache(store: StoreHandle<UrlMapping>) -> MappingCache {
    SnapshotCache::new(CacheKey::url_mappings(), store)
}
