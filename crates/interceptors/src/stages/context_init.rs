use std::time::Instant;

use crate::client_ip::client_ip;
use crate::context::{InterceptContext, ProtoRequest};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Percent-decodes a request path once. `None` when the decoded bytes are not UTF-8.
pub fn decode_path(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|path| path.into_owned())
}

/// Seeds the per-request context before the first stage runs.
pub fn init_context(req: &dyn ProtoRequest) -> InterceptContext {
    let request_id = req
        .header(REQUEST_ID_HEADER)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let decoded = decode_path(req.path());

    InterceptContext {
        request_id,
        started_at: Instant::now(),
        method: req.method().to_string(),
        path_malformed: decoded.is_none(),
        original_path: decoded.unwrap_or_else(|| req.path().to_string()),
        client_ip: client_ip(req),
        ..InterceptContext::default()
    }
}
