use admission_cache::MappingCache;
use admission_core_types::{MappingType, RecordId, UrlMapping};
use serde::Serialize;
use tracing::{debug, warn};

use super::paths::{matches_external, substitute, REGEX_PREFIX};
use crate::errors::RewriteError;
use crate::patterns::PatternCache;

/// Outcome of resolving and rewriting one request path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteResult {
    pub mapping_id: RecordId,
    pub mapping_name: String,
    pub mapping_type: MappingType,
    pub target_service: String,
    pub original_path: String,
    pub rewritten_path: String,
    pub changed: bool,
}

/// Translates external request paths to internal paths using the cached mapping set.
#[derive(Clone)]
pub struct PathRewriteEngine {
    mappings: MappingCache,
    patterns: PatternCache,
}

impl PathRewriteEngine {
    pub fn new(mappings: MappingCache) -> Self {
        Self {
            mappings,
            patterns: PatternCache::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: PatternCache) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn cache(&self) -> &MappingCache {
        &self.mappings
    }

    /// First enabled mapping, in priority order, whose external path matches.
    pub async fn resolve(&self, path: &str) -> Option<UrlMapping> {
        let snapshot = self.mappings.get().await;
        if snapshot.is_degraded() {
            debug!(path, "url mappings unavailable, passing path through");
        }
        self.resolve_in(&snapshot.items, path).cloned()
    }

    pub fn resolve_in<'a>(&self, mappings: &'a [UrlMapping], path: &str) -> Option<&'a UrlMapping> {
        let found = mappings
            .iter()
            .filter(|mapping| mapping.enabled)
            .find(|mapping| matches_external(&mapping.external_path, path, &self.patterns));
        match found {
            Some(mapping) => debug!(path, mapping = %mapping.mapping_name, "url mapping resolved"),
            None => debug!(path, "no url mapping"),
        }
        found
    }

    /// Rewrites `path`; an invalid mapping is logged and the path passes through.
    pub fn rewrite(&self, path: &str, mapping: &UrlMapping) -> String {
        match self.try_rewrite(path, mapping) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                warn!(path, %err, "rewrite skipped");
                path.to_string()
            }
        }
    }

    pub fn try_rewrite(&self, path: &str, mapping: &UrlMapping) -> Result<String, RewriteError> {
        self.validate(mapping)?;
        Ok(substitute(path, &mapping.external_path, &mapping.internal_path))
    }

    pub async fn apply(&self, path: &str) -> Option<RewriteResult> {
        let mapping = self.resolve(path).await?;
        Some(self.result_for(path, &mapping))
    }

    pub fn apply_in(&self, mappings: &[UrlMapping], path: &str) -> Option<RewriteResult> {
        self.resolve_in(mappings, path)
            .map(|mapping| self.result_for(path, mapping))
    }

    fn result_for(&self, path: &str, mapping: &UrlMapping) -> RewriteResult {
        let rewritten = self.rewrite(path, mapping);
        RewriteResult {
            mapping_id: mapping.id,
            mapping_name: mapping.mapping_name.clone(),
            mapping_type: mapping.mapping_type,
            target_service: mapping.target_service.clone(),
            original_path: path.to_string(),
            changed: rewritten != path,
            rewritten_path: rewritten,
        }
    }

    fn validate(&self, mapping: &UrlMapping) -> Result<(), RewriteError> {
        let name = || mapping.mapping_name.clone();
        let external = mapping.external_path.as_str();
        let internal = mapping.internal_path.as_str();

        if external.is_empty() {
            return Err(RewriteError::EmptyPath {
                mapping: name(),
                field: "external_path",
            });
        }
        if internal.is_empty() {
            return Err(RewriteError::EmptyPath {
                mapping: name(),
                field: "internal_path",
            });
        }
        if let Some(expr) = external.strip_prefix(REGEX_PREFIX) {
            self.patterns
                .regex(expr)
                .map_err(|reason| RewriteError::InvalidRegex {
                    mapping: name(),
                    pattern: expr.to_string(),
                    reason,
                })?;
        } else if !external.starts_with('/') {
            return Err(RewriteError::NotAbsolute {
                mapping: name(),
                field: "external_path",
                path: external.to_string(),
            });
        }
        if !internal.starts_with('/') {
            return Err(RewriteError::NotAbsolute {
                mapping: name(),
                field: "internal_path",
                path: internal.to_string(),
            });
        }
        Ok(())
    }
}
