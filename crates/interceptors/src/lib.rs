//! Ordered admission pipeline run in front of every proxied request.
//!
//! Stages run as `AccessControl → UserContext → PathRewrite → Dispatch → Monitoring`; access
//! rules always see the path as received, before any rewrite.

pub mod adapters;
pub mod client_ip;
pub mod context;
pub mod errors;
pub mod identity;
pub mod metrics;
pub mod prelude;
pub mod stages;

pub use context::{InterceptContext, ProtoRequest, ProtoResponse};
pub use errors::InterceptError;
pub use stages::{FilterPipeline, PipelineOutcome, Stage, StageKind, StageOutcome};
