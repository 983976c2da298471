pub mod access;
pub mod errors;
mod patterns;
pub mod rewrite;

pub use access::engine::{AccessDecision, AccessDecisionEngine, DecisionReason, FailPolicy};
pub use access::matcher::RuleMatcher;
pub use errors::{MatchError, RewriteError};
pub use patterns::PatternCache;
pub use rewrite::engine::{PathRewriteEngine, RewriteResult};

#[cfg(test)]
mod tests;
