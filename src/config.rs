//! Gateway configuration: a YAML document plus `GATEWAY__SECTION__KEY=value` overlays.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use admission_cache::CachePolicy;
use admission_interceptors::stages::access_control::default_bypass_prefixes;
use admission_policy::FailPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const ENV_PREFIX: &str = "GATEWAY__";
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("{0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub access_control: AccessControlConfig,
    pub url_mapping: UrlMappingConfig,
    pub monitoring: MonitoringConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Service that receives requests no URL mapping claimed.
    pub default_service: Option<String>,
    pub admin_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_service: None,
            admin_enabled: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessControlConfig {
    pub enabled: bool,
    /// Must be set explicitly; there is no built-in default.
    pub fail_policy: Option<FailPolicy>,
    pub bypass_prefixes: Vec<String>,
    /// Read caller identity from headers set by an authenticating proxy.
    pub trusted_identity_headers: bool,
    pub require_identity_with_token: bool,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_policy: None,
            bypass_prefixes: default_bypass_prefixes(),
            trusted_identity_headers: true,
            require_identity_with_token: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlMappingConfig {
    pub enabled: bool,
}

impl Default for UrlMappingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub load_timeout_ms: u64,
    pub backend: CacheBackendConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            load_timeout_ms: 3000,
            backend: CacheBackendConfig::Local,
        }
    }
}

impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        let ttl_ms = i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        CachePolicy::default()
            .with_ttl(ttl_ms)
            .with_load_timeout(self.load_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheBackendConfig {
    /// Process-local snapshots only.
    #[default]
    Local,
    /// Shared tier in Redis, in front of the local snapshots.
    Redis {
        url: String,
        #[serde(default)]
        key_prefix: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process tables, optionally seeded from a YAML/JSON document at startup.
    Memory {
        #[serde(default)]
        seed: Option<PathBuf>,
    },
    /// A YAML/JSON document read on every cache refresh.
    File { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory { seed: None }
    }
}

impl GatewayConfig {
    pub fn fail_policy(&self) -> Result<FailPolicy, ConfigError> {
        self.access_control.fail_policy.ok_or_else(|| {
            ConfigError::Validation(
                "access_control.fail_policy must be set to `open` or `closed`".to_string(),
            )
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fail_policy()?;
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.load_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "cache.load_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(prefix) = self
            .access_control
            .bypass_prefixes
            .iter()
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(ConfigError::Validation(format!(
                "bypass prefix '{prefix}' must start with '/'"
            )));
        }
        if let StoreConfig::File { path } = &self.store {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Validation("store.path is empty".to_string()));
            }
        }
        if let CacheBackendConfig::Redis { url, .. } = &self.cache.backend {
            if url.trim().is_empty() {
                return Err(ConfigError::Validation("cache.backend.url is empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Reads `path` if it exists, applies environment overlays and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let overlays = env_overlays(env::vars());
    let config = load_config_with(path, &overlays)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_with(
    path: Option<&Path>,
    overlays: &[(String, Value)],
) -> Result<GatewayConfig, ConfigError> {
    let mut document = match path {
        Some(path) if path.exists() => read_document(path)?,
        _ => Value::Object(Map::new()),
    };
    for (key, value) in overlays {
        set_path(&mut document, key, value.clone())?;
    }
    serde_json::from_value(document).map_err(|err| ConfigError::Invalid(err.to_string()))
}

pub fn parse_config(raw: &str) -> Result<GatewayConfig, ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    let document =
        serde_json::to_value(yaml).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    serde_json::from_value(normalize(document)).map_err(|err| ConfigError::Invalid(err.to_string()))
}

fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    let json = serde_json::to_value(yaml).map_err(|err| ConfigError::Invalid(err.to_string()))?;
    Ok(normalize(json))
}

/// An empty YAML document parses as null; treat it as an empty mapping.
fn normalize(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

/// Collects `GATEWAY__A__B=value` pairs as dotted `a.b` paths.
pub fn env_overlays(vars: impl IntoIterator<Item = (String, String)>) -> Vec<(String, Value)> {
    let mut overlays = Vec::new();
    for (key, raw) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(".");
        if path.is_empty() {
            continue;
        }
        overlays.push((path, parse_env_value(&raw)));
    }
    overlays.sort_by(|a, b| a.0.cmp(&b.0));
    overlays
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    Value::String(raw.to_string())
}

fn set_path(document: &mut Value, path: &str, value: Value) -> Result<(), ConfigError> {
    let mut current = document;
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    for segment in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| ConfigError::Invalid(format!("`{path}` crosses a non-mapping value")))?;
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
    }
    let map = current
        .as_object_mut()
        .ok_or_else(|| ConfigError::Invalid(format!("`{path}` crosses a non-mapping value")))?;
    map.insert(last.to_string(), value);
    Ok(())
}

/// `./config/gateway.yaml`, else the per-user config directory.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_PATH);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(mut path) => {
            path.push("admission-gateway");
            path.push("gateway.yaml");
            path
        }
        None => local,
    }
}
