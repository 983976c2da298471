use async_trait::async_trait;
use tracing::info;

use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::metrics;
use crate::stages::{Stage, StageKind, StageOutcome};

/// Records request count, latency and errors once the response status is known.
pub struct MonitoringStage {
    pub enabled: bool,
}

impl Default for MonitoringStage {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[async_trait]
impl Stage for MonitoringStage {
    fn kind(&self) -> StageKind {
        StageKind::Monitoring
    }

    async fn handle(
        &self,
        _cx: &mut InterceptContext,
        _req: &mut dyn ProtoRequest,
        _rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError> {
        Ok(StageOutcome::Continue)
    }

    async fn on_complete(&self, cx: &InterceptContext, status: u16) {
        if !self.enabled {
            return;
        }
        let elapsed = cx.started_at.elapsed();
        metrics::record_request(&cx.method, status, elapsed.as_secs_f64());
        info!(
            request_id = %cx.request_id,
            method = %cx.method,
            path = %cx.original_path,
            status,
            duration_ms = elapsed.as_millis() as u64,
            target = cx.target_service.as_deref().unwrap_or("-"),
            "request completed"
        );
    }
}
