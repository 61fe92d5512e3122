//! Placeholder for feature prefixes with no collaborator mounted.

use axum::response::IntoResponse;
use axum::Router;

use crate::http::response::GatewayError;

/// Router answering every request with 501 for `prefix`.
pub fn router(prefix: &'static str) -> Router {
    Router::new().fallback(move || async move {
        tracing::debug!(prefix, "Request for a feature with no collaborator");
        GatewayError::FeatureNotAttached { prefix }.into_response()
    })
}
