use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::{to_http_response, InterceptError};
use crate::metrics;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

pub mod access_control;
pub mod context_init;
pub mod dispatch;
pub mod monitoring;
pub mod path_rewrite;
pub mod user_context;

/// Pipeline positions, in the only order the pipeline accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    AccessControl,
    UserContext,
    PathRewrite,
    Dispatch,
    Monitoring,
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError>;

    /// Runs after the request finished, whether or not this stage's `handle` ran.
    async fn on_complete(&self, _cx: &InterceptContext, _status: u16) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    ShortCircuit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub status: u16,
    pub short_circuited: bool,
}

/// Stage list validated once at construction: each kind at most once, in [`StageKind`] order,
/// with a dispatch stage present.
pub struct FilterPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl FilterPipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, InterceptError> {
        for pair in stages.windows(2) {
            let (prev, next) = (pair[0].kind(), pair[1].kind());
            if prev >= next {
                return Err(InterceptError::config(&format!(
                    "stage {next:?} cannot follow {prev:?}"
                )));
            }
        }
        if !stages.iter().any(|s| s.kind() == StageKind::Dispatch) {
            return Err(InterceptError::config("pipeline has no dispatch stage"));
        }
        Ok(Self { stages })
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Runs the stages in order. A stage error is rendered onto `rsp` and ends the request.
    pub async fn run(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        rsp: &mut dyn ProtoResponse,
    ) -> PipelineOutcome {
        let mut outcome = PipelineOutcome {
            status: 200,
            short_circuited: false,
        };
        let mut failed = false;

        for stage in &self.stages {
            match stage.handle(cx, req, rsp).await {
                Ok(StageOutcome::Continue) => {}
                Ok(StageOutcome::ShortCircuit) => {
                    debug!(stage = ?stage.kind(), request_id = %cx.request_id, "pipeline short-circuited");
                    outcome.short_circuited = true;
                    break;
                }
                Err(err) => {
                    let err = err.with_correlation(&cx.request_id);
                    report_rejection(stage.kind(), &err);
                    outcome.status = render_error(&err, rsp).await;
                    outcome.short_circuited = true;
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if let Some(status) = cx.extensions.get::<ResponseStatus>() {
                outcome.status = status.0;
            }
        }

        for stage in self.stages.iter().rev() {
            stage.on_complete(cx, outcome.status).await;
        }
        outcome
    }
}

/// Status a stage wrote to the response, recorded for completion hooks.
#[derive(Clone, Copy, Debug)]
pub struct ResponseStatus(pub u16);

fn report_rejection(stage: StageKind, err: &InterceptError) {
    let obj = &err.0;
    metrics::record_rejection(obj);
    let audit = obj.to_audit();
    if obj.severity.is_fault() {
        tracing::error!(?stage, ?audit, "request failed");
    } else {
        debug!(?stage, ?audit, "request rejected");
    }
}

async fn render_error(err: &InterceptError, rsp: &mut dyn ProtoResponse) -> u16 {
    let (status, body) = to_http_response(err);
    rsp.set_status(status);
    rsp.insert_header("Content-Type", "application/json");
    if let Err(write_err) = rsp.write_json(&body).await {
        tracing::error!(%write_err, "failed to write error response");
    }
    status
}
