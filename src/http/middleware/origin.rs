//! Cross-origin policy, the first stage of the pipeline.
//!
//! # Responsibilities
//! - Answer every `OPTIONS` request immediately with 204
//! - Echo the caller's `Origin` with credentials allowed
//! - Advertise the accepted methods and request headers
//!
//! # Design Decisions
//! - Written as plain middleware instead of `CorsLayer`: preflights must end
//!   here even without `Access-Control-Request-Method`
//! - The allow-origin value can only be built from the request's own
//!   `Origin`, so a wildcard is never paired with credentials

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::CorsOrigin;
use crate::observability::metrics;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type,Authorization";

/// Which origins get credentialed cross-origin access.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Option<Arc<[String]>>,
}

/// An origin cleared for credentialed access, copied from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigin(HeaderValue);

impl AllowedOrigin {
    pub fn as_header(&self) -> &HeaderValue {
        &self.0
    }
}

impl OriginPolicy {
    pub fn new(mode: &CorsOrigin) -> Self {
        let allowed = match mode {
            CorsOrigin::ReflectAll => None,
            CorsOrigin::List(origins) => Some(origins.clone().into()),
        };
        Self { allowed }
    }

    pub fn reflect_all() -> Self {
        Self { allowed: None }
    }

    /// Decide whether `origin` gets CORS headers.
    pub fn admit(&self, origin: Option<&HeaderValue>) -> Option<AllowedOrigin> {
        let origin = origin?;
        let text = origin.to_str().ok()?;
        if text.is_empty() || text == "*" {
            return None;
        }
        match &self.allowed {
            None => Some(AllowedOrigin(origin.clone())),
            Some(list) => list
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(text))
                .then(|| AllowedOrigin(origin.clone())),
        }
    }

    fn decorate(&self, headers: &mut HeaderMap, allowed: Option<&AllowedOrigin>, preflight: bool) {
        headers.append(VARY, HeaderValue::from_static("Origin"));
        let Some(allowed) = allowed else {
            return;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allowed.as_header().clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        if preflight {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
        }
    }
}

pub async fn apply_origin_policy(
    State(policy): State<OriginPolicy>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let allowed = policy.admit(req.headers().get(ORIGIN));

    if req.method() == Method::OPTIONS {
        metrics::record_preflight();
        tracing::debug!(
            path = %req.uri().path(),
            allowed = allowed.is_some(),
            "Answering preflight"
        );
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.decorate(response.headers_mut(), allowed.as_ref(), true);
        return response;
    }

    let mut response = next.run(req).await;
    policy.decorate(response.headers_mut(), allowed.as_ref(), false);
    response
}
