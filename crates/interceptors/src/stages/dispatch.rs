use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::stages::{ResponseStatus, Stage, StageKind, StageOutcome};

/// What the gateway would forward downstream once admission and rewrite are done.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForwardPlan {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub original_path: String,
    pub target_service: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct DispatchReply {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
}

/// Reverse-proxy collaborator that moves the request to the chosen backend.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, plan: ForwardPlan) -> Result<DispatchReply, InterceptError>;
}

/// Answers with the forward plan instead of proxying.
#[derive(Clone, Debug, Default)]
pub struct DryRunDispatcher;

#[async_trait]
impl Dispatcher for DryRunDispatcher {
    async fn dispatch(&self, plan: ForwardPlan) -> Result<DispatchReply, InterceptError> {
        let mut headers = BTreeMap::new();
        headers.insert("X-Target-Service".to_string(), plan.target_service.clone());
        Ok(DispatchReply {
            status: 200,
            headers,
            body: json!({ "forward": plan }),
        })
    }
}

pub struct DispatchStage {
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Service used when no URL mapping named one; unmapped requests are rejected without it.
    pub default_service: Option<String>,
}

impl DispatchStage {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            dispatcher,
            default_service: None,
        }
    }

    pub fn with_default_service(mut self, service: Option<String>) -> Self {
        self.default_service = service;
        self
    }
}

#[async_trait]
impl Stage for DispatchStage {
    fn kind(&self) -> StageKind {
        StageKind::Dispatch
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError> {
        let target = cx
            .target_service
            .clone()
            .or_else(|| self.default_service.clone())
            .ok_or_else(|| InterceptError::route_not_found(req.path()))?;

        let plan = ForwardPlan {
            request_id: cx.request_id.clone(),
            method: cx.method.clone(),
            path: req.path().to_string(),
            original_path: cx.original_path.clone(),
            target_service: target,
            headers: cx.forward_headers.clone(),
        };
        let reply = self.dispatcher.dispatch(plan).await?;

        rsp.set_status(reply.status);
        rsp.insert_header("X-Request-Id", &cx.request_id);
        for (name, value) in &reply.headers {
            rsp.insert_header(name, value);
        }
        rsp.write_json(&reply.body).await?;
        cx.extensions.insert(ResponseStatus(reply.status));
        Ok(StageOutcome::Continue)
    }
}
