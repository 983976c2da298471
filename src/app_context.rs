use std::path::Path;
use std::sync::Arc;

use admission_cache::{
    mapping_cache, rule_cache, CacheError, CachedRecord, EntryInfo, MappingCache, RemoteHandle,
    RuleCache, SnapshotCache, StoreHandle,
};
use admission_core_types::{AccessRule, Prioritized, RecordId, UrlMapping};
use admission_interceptors::identity::TrustedHeaderResolver;
use admission_interceptors::prelude::*;
use admission_policy::{AccessDecisionEngine, PathRewriteEngine};
use admission_store::prelude::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{CacheBackendConfig, GatewayConfig, StoreConfig};
use crate::metrics;

/// Store, caches and engines for one gateway process.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<GatewayConfig>,
    rule_store: StoreHandle<AccessRule>,
    mapping_store: StoreHandle<UrlMapping>,
    access: AccessDecisionEngine,
    rewrite: PathRewriteEngine,
    instance_id: String,
    started_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheStatus {
    pub name: &'static str,
    pub entry: Option<EntryInfo>,
    pub stats: admission_cache::StatsSnapshot,
}

impl AppContext {
    /// Opens the configured store and shared cache tier.
    pub async fn build(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let (rule_store, mapping_store) = open_stores(&config.store).await?;
        let remote = open_remote(&config.cache.backend).await?;
        Self::with_stores(config, rule_store, mapping_store, remote)
    }

    pub fn with_stores(
        config: GatewayConfig,
        rule_store: StoreHandle<AccessRule>,
        mapping_store: StoreHandle<UrlMapping>,
        remote: Option<RemoteHandle>,
    ) -> Result<Self> {
        let fail_policy = config.fail_policy()?;
        let policy = config.cache.policy();

        let mut rules = rule_cache(rule_store.clone()).with_policy(policy.clone());
        let mut mappings = mapping_cache(mapping_store.clone()).with_policy(policy);
        if let Some(remote) = remote {
            rules = rules.with_remote(remote.clone());
            mappings = mappings.with_remote(remote);
        }

        Ok(Self {
            config: Arc::new(config),
            rule_store,
            mapping_store,
            access: AccessDecisionEngine::new(rules, fail_policy),
            rewrite: PathRewriteEngine::new(mappings),
            instance_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessDecisionEngine {
        &self.access
    }

    pub fn rewrite(&self) -> &PathRewriteEngine {
        &self.rewrite
    }

    pub fn rules(&self) -> &RuleCache {
        self.access.cache()
    }

    pub fn mappings(&self) -> &MappingCache {
        self.rewrite.cache()
    }

    pub fn rule_store(&self) -> &StoreHandle<AccessRule> {
        &self.rule_store
    }

    pub fn mapping_store(&self) -> &StoreHandle<UrlMapping> {
        &self.mapping_store
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Loads both sets once so the first requests hit a warm cache. Returns the failures.
    pub async fn warm_up(&self) -> Vec<String> {
        let mut failures = Vec::new();
        match self.refresh_access_rules().await {
            Ok(count) => info!(count, "access rules loaded"),
            Err(err) => {
                warn!(%err, "access rules not loaded at startup");
                failures.push(format!("access rules: {err}"));
            }
        }
        match self.refresh_url_mappings().await {
            Ok(count) => info!(count, "url mappings loaded"),
            Err(err) => {
                warn!(%err, "url mappings not loaded at startup");
                failures.push(format!("url mappings: {err}"));
            }
        }
        failures
    }

    pub async fn refresh_access_rules(&self) -> Result<usize, CacheError> {
        Ok(self.rules().try_refresh().await?.len())
    }

    pub async fn clear_access_rules(&self) -> Result<usize, CacheError> {
        self.rules().invalidate().await?;
        Ok(0)
    }

    pub async fn refresh_url_mappings(&self) -> Result<usize, CacheError> {
        Ok(self.mappings().try_refresh().await?.len())
    }

    pub async fn clear_url_mappings(&self) -> Result<usize, CacheError> {
        self.mappings().invalidate().await?;
        Ok(0)
    }

    /// Creates or replaces an access rule from its row form and reloads the cached set.
    pub async fn save_access_rule(&self, row: Row) -> Result<AccessRule, StoreError> {
        upsert(&self.rule_store, self.rules(), row).await
    }

    pub async fn delete_access_rule(&self, id: RecordId) -> Result<(), StoreError> {
        remove(&self.rule_store, self.rules(), id).await
    }

    pub async fn save_url_mapping(&self, row: Row) -> Result<UrlMapping, StoreError> {
        upsert(&self.mapping_store, self.mappings(), row).await
    }

    pub async fn delete_url_mapping(&self, id: RecordId) -> Result<(), StoreError> {
        remove(&self.mapping_store, self.mappings(), id).await
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        vec![
            CacheStatus {
                name: "access_rules",
                entry: self.rules().entry_info(),
                stats: self.rules().stats().snapshot(),
            },
            CacheStatus {
                name: "url_mappings",
                entry: self.mappings().entry_info(),
                stats: self.mappings().stats().snapshot(),
            },
        ]
    }

    pub fn publish_cache_metrics(&self) {
        for status in self.cache_status() {
            metrics::observe_cache(status.name, &status.stats);
        }
    }

    /// Builds the request pipeline from the configured stages.
    pub fn pipeline(&self, dispatcher: Arc<dyn Dispatcher>) -> Result<FilterPipeline> {
        let config = &self.config;
        let mut access = AccessControlStage::new(self.access.clone())
            .with_enabled(config.access_control.enabled)
            .with_bypass_prefixes(config.access_control.bypass_prefixes.clone());
        if config.access_control.trusted_identity_headers {
            let resolver = TrustedHeaderResolver {
                require_identity_with_token: config.access_control.require_identity_with_token,
                ..TrustedHeaderResolver::default()
            };
            access = access.with_identity(Arc::new(resolver));
        }

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(access),
            Box::new(UserContextStage),
            Box::new(PathRewriteStage::new(self.rewrite.clone()).with_enabled(config.url_mapping.enabled)),
            Box::new(
                DispatchStage::new(dispatcher)
                    .with_default_service(config.server.default_service.clone()),
            ),
        ];
        if config.monitoring.enabled {
            stages.push(Box::new(MonitoringStage::default()));
        }
        Ok(FilterPipeline::new(stages)?)
    }
}

async fn upsert<E: CachedRecord>(
    store: &StoreHandle<E>,
    cache: &SnapshotCache<E>,
    mut row: Row,
) -> Result<E, StoreError> {
    row.entry("id").or_insert(serde_json::json!(0));
    let record = E::from_row(&row)?;
    let saved = store.save(&record).await?;
    info!(table = E::TABLE, id = saved.record_id(), "record saved");
    cache.refresh().await;
    Ok(saved)
}

async fn remove<E: CachedRecord>(
    store: &StoreHandle<E>,
    cache: &SnapshotCache<E>,
    id: RecordId,
) -> Result<(), StoreError> {
    store.delete(id).await?;
    info!(table = E::TABLE, id, "record deleted");
    cache.refresh().await;
    Ok(())
}

async fn open_stores(
    config: &StoreConfig,
) -> Result<(StoreHandle<AccessRule>, StoreHandle<UrlMapping>)> {
    match config {
        StoreConfig::Memory { seed } => {
            let memory = MemoryStore::new();
            if let Some(path) = seed {
                seed_memory(&memory, path).await?;
            }
            let rules: InMemoryRepository<AccessRule> = InMemoryRepository::new(&memory);
            let mappings: InMemoryRepository<UrlMapping> = InMemoryRepository::new(&memory);
            Ok((Arc::new(rules), Arc::new(mappings)))
        }
        StoreConfig::File { path } => {
            let file = FileStore::new(path.clone());
            info!(path = %path.display(), "using file store");
            let rules: FileRepository<AccessRule> = FileRepository::new(&file);
            let mappings: FileRepository<UrlMapping> = FileRepository::new(&file);
            Ok((Arc::new(rules), Arc::new(mappings)))
        }
    }
}

async fn seed_memory(memory: &MemoryStore, path: &Path) -> Result<()> {
    let file = FileStore::new(path);
    let rules = FileRepository::<AccessRule>::new(&file)
        .list_all()
        .await
        .with_context(|| format!("failed to seed access rules from {}", path.display()))?;
    let mappings = FileRepository::<UrlMapping>::new(&file)
        .list_all()
        .await
        .with_context(|| format!("failed to seed url mappings from {}", path.display()))?;
    memory.seed(&rules);
    memory.seed(&mappings);
    info!(
        path = %path.display(),
        rules = rules.len(),
        mappings = mappings.len(),
        "memory store seeded"
    );
    Ok(())
}

async fn open_remote(config: &CacheBackendConfig) -> Result<Option<RemoteHandle>> {
    match config {
        CacheBackendConfig::Local => Ok(None),
        #[cfg(feature = "redis")]
        CacheBackendConfig::Redis { url, key_prefix } => {
            let backend = admission_cache::RedisBackend::connect(
                admission_cache::RedisConfig::new(url.clone()).with_prefix(key_prefix.clone()),
            )
            .await?;
            info!("shared redis cache tier enabled");
            Ok(Some(Arc::new(backend)))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackendConfig::Redis { .. } => {
            anyhow::bail!("cache.backend redis requires the `redis` feature")
        }
    }
}
