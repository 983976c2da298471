use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use admission_cache::prelude::*;
use admission_core_types::{AccessRule, MatchPattern, MatchType, RecordId, RuleType, UrlMapping};
use admission_store::prelude::*;
use async_trait::async_trait;
use tokio::time::{sleep, Duration};

/// Wraps an in-memory repository with an outage switch, a load delay and a load counter.
struct FlakyStore<E: Record> {
    inner: InMemoryRepository<E>,
    up: AtomicBool,
    delay_ms: AtomicU64,
    loads: AtomicUsize,
}

impl<E: Record> FlakyStore<E> {
    fn new(store: &MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryRepository::new(store),
            up: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
            loads: AtomicUsize::new(0),
        })
    }

    fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    fn set_delay(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Record> Repository<E> for FlakyStore<E> {
    async fn list_enabled(&self) -> Result<Vec<E>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            sleep(Duration::from_millis(delay)).await;
        }
        if !self.up.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        self.inner.list_enabled().await
    }

    async fn list_all(&self) -> Result<Vec<E>, StoreError> {
        self.inner.list_all().await
    }

    async fn get(&self, id: RecordId) -> Result<Option<E>, StoreError> {
        self.inner.get(id).await
    }

    async fn save(&self, entity: &E) -> Result<E, StoreError> {
        self.inner.save(entity).await
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }
}

fn rule(id: RecordId, priority: i32) -> AccessRule {
    AccessRule::new(
        id,
        format!("rule-{id}"),
        RuleType::Blacklist,
        MatchType::Path,
        MatchPattern::Prefix,
        format!("/r{id}"),
    )
    .with_priority(priority)
}

fn seeded() -> (MemoryStore, Arc<FlakyStore<AccessRule>>) {
    let memory = MemoryStore::new();
    memory.seed(&[rule(1, 5), rule(2, 10), rule(3, 10), rule(4, 50).disabled()]);
    let store = FlakyStore::new(&memory);
    (memory, store)
}

#[tokio::test]
async fn first_read_loads_then_hits() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone());

    let first = cache.get().await;
    assert_eq!(first.origin, SnapshotOrigin::Loaded);
    let ids: Vec<_> = first.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);

    let second = cache.get().await;
    assert_eq!(second.origin, SnapshotOrigin::Cached);
    assert_eq!(store.loads(), 1);

    let stats = cache.stats().snapshot();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.loads, 1);
}

#[tokio::test]
async fn ttl_expiry_triggers_reload() {
    let (memory, store) = seeded();
    let cache = rule_cache(store.clone()).with_policy(CachePolicy::default().with_ttl(40));

    assert_eq!(cache.get().await.len(), 3);
    memory.seed(&[rule(9, 1)]);
    assert_eq!(cache.get().await.len(), 3, "still within ttl");

    sleep(Duration::from_millis(60)).await;
    let reloaded = cache.get().await;
    assert_eq!(reloaded.origin, SnapshotOrigin::Loaded);
    assert_eq!(reloaded.len(), 4);
    assert_eq!(store.loads(), 2);
}

#[tokio::test(start_paused = true)]
async fn local_ttl_follows_the_monotonic_clock() {
    let (memory, store) = seeded();
    let cache = rule_cache(store.clone()).with_policy(CachePolicy::default().with_ttl(1_000));

    assert_eq!(cache.get().await.origin, SnapshotOrigin::Loaded);
    memory.seed(&[rule(9, 1)]);

    tokio::time::advance(Duration::from_millis(999)).await;
    let cached = cache.get().await;
    assert_eq!(cached.origin, SnapshotOrigin::Cached);
    assert_eq!(cached.len(), 3);
    assert!(cache.entry_info().is_some_and(|info| info.fresh));

    tokio::time::advance(Duration::from_millis(2)).await;
    assert!(cache.entry_info().is_some_and(|info| !info.fresh));
    let reloaded = cache.get().await;
    assert_eq!(reloaded.origin, SnapshotOrigin::Loaded);
    assert_eq!(reloaded.len(), 4);
    assert_eq!(store.loads(), 2);
}

#[tokio::test]
async fn invalidate_forces_reload() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone());
    cache.get().await;
    cache.invalidate().await.unwrap();
    assert!(cache.entry_info().is_none());

    assert_eq!(cache.get().await.origin, SnapshotOrigin::Loaded);
    assert_eq!(store.loads(), 2);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_entry() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone());
    cache.get().await;

    store.set_up(false);
    let refreshed = cache.refresh().await;
    assert!(refreshed.is_empty());
    assert!(cache.try_refresh().await.is_err());

    let read = cache.get().await;
    assert_eq!(read.origin, SnapshotOrigin::Cached);
    assert_eq!(read.len(), 3);
}

#[tokio::test]
async fn expired_and_unreachable_is_degraded() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone()).with_policy(CachePolicy::default().with_ttl(20));
    cache.get().await;
    store.set_up(false);
    sleep(Duration::from_millis(40)).await;

    let read = cache.get().await;
    assert!(read.is_degraded());
    assert!(read.is_empty());
    assert_eq!(cache.stats().snapshot().errors, 1);
}

#[tokio::test]
async fn slow_store_times_out_as_unreachable() {
    let (_memory, store) = seeded();
    store.set_delay(200);
    let cache = rule_cache(store.clone()).with_policy(CachePolicy::default().with_load_timeout(20));

    let err = cache.try_refresh().await.unwrap_err();
    assert_eq!(err.code().0, "STORAGE.TIMEOUT");
    assert!(cache.get().await.is_degraded());
}

#[tokio::test]
async fn cancelled_reader_does_not_abort_refresh() {
    let (_memory, store) = seeded();
    store.set_delay(50);
    let cache = rule_cache(store.clone());

    let abandoned = tokio::time::timeout(Duration::from_millis(5), cache.get()).await;
    assert!(abandoned.is_err());
    assert!(cache.entry_info().is_none());

    sleep(Duration::from_millis(120)).await;
    let info = cache.entry_info().expect("refresh completed in the background");
    assert_eq!(info.count, 3);
    assert!(info.fresh);
}

#[tokio::test]
async fn concurrent_refresh_with_unreachable_store_converges_on_empty() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone());
    cache.get().await;
    store.set_up(false);
    store.set_delay(20);

    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    assert!(a.is_empty());
    assert!(b.is_empty());

    let third = cache.get().await;
    let ids: Vec<_> = third.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[tokio::test]
async fn concurrent_readers_never_see_partial_sets() {
    let (memory, store) = seeded();
    let cache = rule_cache(store.clone());
    cache.get().await;

    let mut tasks = Vec::new();
    for round in 0..20 {
        let cache = cache.clone();
        let memory = memory.clone();
        tasks.push(tokio::spawn(async move {
            if round % 2 == 0 {
                memory.seed(&[rule(100 + round, 1)]);
                cache.refresh().await;
            }
            let snapshot = cache.get().await;
            assert!(snapshot.len() >= 3);
            let mut sorted = snapshot.items.as_ref().clone();
            admission_core_types::sort_by_priority(&mut sorted);
            assert_eq!(&sorted, snapshot.items.as_ref());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn shared_backend_serves_second_instance() {
    let memory = MemoryStore::new();
    memory.seed(&[UrlMapping::new(1, "legacy", "/old/**", "/new/**", "legacy")]);
    let store_a: Arc<FlakyStore<UrlMapping>> = FlakyStore::new(&memory);
    let store_b: Arc<FlakyStore<UrlMapping>> = FlakyStore::new(&memory);
    let backend = Arc::new(MemoryBackend::new());

    let a = mapping_cache(store_a.clone()).with_remote(backend.clone());
    let b = mapping_cache(store_b.clone()).with_remote(backend.clone());

    assert_eq!(a.get().await.origin, SnapshotOrigin::Loaded);
    assert_eq!(backend.len(), 1);

    let from_shared = b.get().await;
    assert_eq!(from_shared.origin, SnapshotOrigin::Cached);
    assert_eq!(from_shared.items[0].internal_path, "/new/**");
    assert_eq!(store_b.loads(), 0);

    b.invalidate().await.unwrap();
    assert!(backend.is_empty());
}

struct BrokenBackend;

#[async_trait]
impl RemoteCache for BrokenBackend {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::backend_unavailable("connection reset"))
    }

    async fn set(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), CacheError> {
        Err(CacheError::backend_unavailable("connection reset"))
    }

    async fn remove(&self, _key: &CacheKey) -> Result<(), CacheError> {
        Err(CacheError::backend_unavailable("connection reset"))
    }
}

#[tokio::test]
async fn backend_failure_falls_through_to_store() {
    let (_memory, store) = seeded();
    let cache = rule_cache(store.clone()).with_remote(Arc::new(BrokenBackend));

    let read = cache.get().await;
    assert_eq!(read.origin, SnapshotOrigin::Loaded);
    assert_eq!(read.len(), 3);
    assert_eq!(cache.stats().snapshot().errors, 2);
}
