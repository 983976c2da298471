use admission_policy::PathRewriteEngine;
use async_trait::async_trait;
use tracing::debug;

use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::metrics;
use crate::stages::{Stage, StageKind, StageOutcome};

pub const ORIGINAL_PATH: &str = "X-Original-Path";
pub const TARGET_SERVICE: &str = "X-Target-Service";

/// Resolves the URL mapping and rewrites the request path in place.
pub struct PathRewriteStage {
    pub engine: PathRewriteEngine,
    pub enabled: bool,
}

impl PathRewriteStage {
    pub fn new(engine: PathRewriteEngine) -> Self {
        Self {
            engine,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[async_trait]
impl Stage for PathRewriteStage {
    fn kind(&self) -> StageKind {
        StageKind::PathRewrite
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        _rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError> {
        if !self.enabled {
            return Ok(StageOutcome::Continue);
        }
        let path = req.path().to_string();
        let Some(result) = self.engine.apply(&path).await else {
            metrics::record_rewrite("no_mapping");
            return Ok(StageOutcome::Continue);
        };

        cx.target_service = Some(result.target_service.clone());
        if result.changed {
            debug!(
                request_id = %cx.request_id,
                from = %result.original_path,
                to = %result.rewritten_path,
                mapping = %result.mapping_name,
                "path rewritten"
            );
            req.set_path(&result.rewritten_path);
            req.insert_header(ORIGINAL_PATH, &result.original_path);
            req.insert_header(TARGET_SERVICE, &result.target_service);
            cx.forward_headers
                .insert(ORIGINAL_PATH.to_string(), result.original_path.clone());
            cx.forward_headers
                .insert(TARGET_SERVICE.to_string(), result.target_service.clone());
            metrics::record_rewrite("rewritten");
        } else {
            metrics::record_rewrite("unchanged");
        }
        cx.rewrite = Some(result);
        Ok(StageOutcome::Continue)
    }
}
