pub use crate::client_ip::client_ip;
pub use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
pub use crate::errors::{to_http_response, InterceptError};
pub use crate::identity::{IdentityResolver, TrustedHeaderResolver};
pub use crate::stages::access_control::AccessControlStage;
pub use crate::stages::context_init::init_context;
pub use crate::stages::dispatch::{
    DispatchReply, DispatchStage, Dispatcher, DryRunDispatcher, ForwardPlan,
};
pub use crate::stages::monitoring::MonitoringStage;
pub use crate::stages::path_rewrite::PathRewriteStage;
pub use crate::stages::user_context::UserContextStage;
pub use crate::stages::{
    FilterPipeline, PipelineOutcome, ResponseStatus, Stage, StageKind, StageOutcome,
};

#[cfg(feature = "with-axum")]
pub use crate::adapters::http::{handle_with_pipeline, AxumReq, AxumRes};
