//! Request logger stage: one structured line per request that reaches it.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{SecondsFormat, Utc};

use crate::http::request::request_id;
use crate::observability::metrics;

pub async fn log_request(req: Request<Body>, next: Next) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    tracing::info!(
        timestamp = %timestamp,
        method = %req.method(),
        path = %req.uri().path(),
        request_id = request_id(req.headers()).unwrap_or("-"),
        "Request"
    );
    metrics::record_request(req.method().as_str());

    next.run(req).await
}
