use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;

use admission_core_types::UserIdentity;
use admission_policy::{AccessDecision, RewriteResult};
use async_trait::async_trait;
use http::Extensions;

/// Per-request state shared by the pipeline stages.
#[derive(Clone, Debug)]
pub struct InterceptContext {
    pub request_id: String,
    pub started_at: Instant,
    pub method: String,
    /// Percent-decoded path as received, before any rewrite.
    pub original_path: String,
    /// The raw path did not decode to UTF-8; `original_path` then holds it undecoded.
    pub path_malformed: bool,
    pub client_ip: String,
    pub identity: Option<UserIdentity>,
    pub decision: Option<AccessDecision>,
    pub rewrite: Option<RewriteResult>,
    pub target_service: Option<String>,
    /// Headers added for the downstream service.
    pub forward_headers: BTreeMap<String, String>,
    pub extensions: Extensions,
}

impl Default for InterceptContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            started_at: Instant::now(),
            method: String::new(),
            original_path: String::new(),
            path_malformed: false,
            client_ip: String::new(),
            identity: None,
            decision: None,
            rewrite: None,
            target_service: None,
            forward_headers: BTreeMap::new(),
            extensions: Extensions::new(),
        }
    }
}

impl InterceptContext {
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.user_id.as_str())
    }
}

pub trait ProtoRequest: Send {
    fn method(&self) -> &str;
    fn path(&self) -> &str;
    fn set_path(&mut self, path: &str);
    fn header(&self, name: &str) -> Option<String>;
    fn insert_header(&mut self, name: &str, value: &str);
    fn remove_header(&mut self, name: &str);
    fn remote_addr(&self) -> Option<SocketAddr>;
}

#[async_trait]
pub trait ProtoResponse: Send {
    fn set_status(&mut self, code: u16);
    fn insert_header(&mut self, name: &str, value: &str);
    async fn write_json(
        &mut self,
        body: &serde_json::Value,
    ) -> Result<(), crate::errors::InterceptError>;
}
