use std::sync::Arc;

use admission_core_types::RequestAttributes;
use admission_errors::codes;
use admission_policy::AccessDecisionEngine;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::identity::IdentityResolver;
use crate::metrics;
use crate::stages::{Stage, StageKind, StageOutcome};

pub fn default_bypass_prefixes() -> Vec<String> {
    vec![
        "/csr/contract/auth/".into(),
        "/auth/".into(),
        "/login".into(),
        "/register".into(),
    ]
}

/// Admits or rejects the request against the access rules, using the decoded path as received.
pub struct AccessControlStage {
    pub engine: AccessDecisionEngine,
    pub enabled: bool,
    pub bypass_prefixes: Vec<String>,
    pub identity: Option<Arc<dyn IdentityResolver>>,
}

impl AccessControlStage {
    pub fn new(engine: AccessDecisionEngine) -> Self {
        Self {
            engine,
            enabled: true,
            bypass_prefixes: default_bypass_prefixes(),
            identity: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_bypass_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.bypass_prefixes = prefixes;
        self
    }

    pub fn with_identity(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identity = Some(resolver);
        self
    }

    fn bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[async_trait]
impl Stage for AccessControlStage {
    fn kind(&self) -> StageKind {
        StageKind::AccessControl
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        _rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError> {
        if let Some(resolver) = &self.identity {
            cx.identity = resolver.resolve(req).await?;
        }
        if self.enabled && cx.path_malformed {
            metrics::record_decision("malformed_path", false);
            info!(
                request_id = %cx.request_id,
                path = %cx.original_path,
                client_ip = %cx.client_ip,
                "request denied, path does not decode"
            );
            return Err(InterceptError::denied(
                codes::ACCESS_DENIED,
                "request path is not valid percent-encoded UTF-8",
                None,
                &cx.request_id,
            ));
        }
        if !self.enabled || self.bypassed(&cx.original_path) {
            debug!(path = %cx.original_path, "access control skipped");
            return Ok(StageOutcome::Continue);
        }

        let mut request = RequestAttributes::new(cx.method.clone(), cx.original_path.clone())
            .with_client_ip(cx.client_ip.clone());
        request.user_id = cx.user_id().map(str::to_string);

        let decision = self.engine.evaluate(&request).await;
        metrics::record_decision(decision.verdict(), decision.allowed);
        let denial = decision.error_code().map(|code| {
            InterceptError::denied(
                code,
                &format!("request denied ({})", decision.verdict()),
                decision.rule_name(),
                &cx.request_id,
            )
        });
        cx.decision = Some(decision);

        match denial {
            Some(err) => {
                info!(
                    request_id = %cx.request_id,
                    path = %cx.original_path,
                    method = %cx.method,
                    client_ip = %cx.client_ip,
                    code = err.code().0,
                    "request denied"
                );
                Err(err)
            }
            None => Ok(StageOutcome::Continue),
        }
    }
}
