use std::net::SocketAddr;
use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::context::{ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::stages::context_init::init_context;
use crate::stages::FilterPipeline;

pub struct AxumReq<'a> {
    pub req: &'a mut Request<Body>,
    pub remote: Option<SocketAddr>,
}

impl ProtoRequest for AxumReq<'_> {
    fn method(&self) -> &str {
        self.req.method().as_str()
    }

    fn path(&self) -> &str {
        self.req.uri().path()
    }

    /// Replaces the path and keeps the query string.
    fn set_path(&mut self, path: &str) {
        let uri = self.req.uri().clone();
        let target = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };
        let mut parts = uri.into_parts();
        match PathAndQuery::from_str(&target) {
            Ok(path_and_query) => {
                parts.path_and_query = Some(path_and_query);
                match Uri::from_parts(parts) {
                    Ok(uri) => *self.req.uri_mut() = uri,
                    Err(err) => warn!(%err, path, "rewritten uri rejected"),
                }
            }
            Err(err) => warn!(%err, path, "rewritten path rejected"),
        }
    }

    fn header(&self, name: &str) -> Option<String> {
        self.req
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.req.headers_mut().insert(name, value);
        }
    }

    fn remove_header(&mut self, name: &str) {
        if let Ok(name) = HeaderName::from_str(name) {
            self.req.headers_mut().remove(name);
        }
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }
}

pub struct AxumRes {
    pub headers: HeaderMap,
    pub status: StatusCode,
    pub body: Option<serde_json::Value>,
}

impl Default for AxumRes {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
            body: None,
        }
    }
}

impl IntoResponse for AxumRes {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => Json(body).into_response(),
            None => Response::new(Body::empty()),
        };
        *response.status_mut() = self.status;
        response.headers_mut().extend(self.headers);
        response
    }
}

#[async_trait]
impl ProtoResponse for AxumRes {
    fn set_status(&mut self, code: u16) {
        self.status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
    }

    async fn write_json(&mut self, body: &serde_json::Value) -> Result<(), InterceptError> {
        self.body = Some(body.clone());
        Ok(())
    }
}

/// Runs one axum request through the pipeline and turns the outcome into a response.
pub async fn handle_with_pipeline(
    mut req: Request<Body>,
    remote: Option<SocketAddr>,
    pipeline: &FilterPipeline,
) -> Response {
    let mut preq = AxumReq {
        req: &mut req,
        remote,
    };
    let mut cx = init_context(&preq);
    let mut pres = AxumRes::default();
    pipeline.run(&mut cx, &mut preq, &mut pres).await;
    pres.into_response()
}
