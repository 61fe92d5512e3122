//! What downstream handlers receive from the pipeline.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) unless the client sent one
//! - Carry the decoded body as [`ParsedBody`]
//! - Bundle method, path, headers, body and session into [`RequestContext`]
//!
//! # Design Decisions
//! - Extractors read request extensions set by earlier stages; a missing
//!   extension means the handler was mounted outside the pipeline and is a
//!   server error, not a client one

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, Method, Request};
use serde_json::{Map, Value};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::response::GatewayError;
use crate::session::Session;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Read the request ID assigned at the edge of the pipeline.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
}

/// Structured request body.
///
/// Bodies the decoder does not understand, and requests without a body,
/// read as an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody(pub Value);

impl ParsedBody {
    pub fn empty() -> Self {
        ParsedBody(Value::Object(Map::new()))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl Default for ParsedBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ParsedBody>().cloned().unwrap_or_default())
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(GatewayError::MissingExtension("session"))
    }
}

/// Everything a feature handler gets from the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path as seen by the handler (mount prefix removed).
    pub path: String,
    pub headers: HeaderMap,
    pub body: ParsedBody,
    pub session: Session,
}

impl RequestContext {
    pub fn request_id(&self) -> Option<&str> {
        request_id(&self.headers)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let body = ParsedBody::from_request_parts(parts, state).await?;
        Ok(Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            body,
            session,
        })
    }
}
