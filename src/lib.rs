//! Admission gateway library
//!
//! Exposes the wiring used by the binary so integration tests can drive it.

pub mod app_context;
pub mod cli;
pub mod config;
pub mod metrics;
pub mod server;

pub use app_context::AppContext;
pub use config::GatewayConfig;
