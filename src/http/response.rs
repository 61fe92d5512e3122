//! Error responses produced by the gateway itself.
//!
//! # Responsibilities
//! - One error type for every response a pipeline stage generates on its own
//! - Map each failure to its HTTP status
//! - Render the shared JSON envelope: `{ "error": { "code", "message" } }`
//!
//! # Design Decisions
//! - Backend error details are logged, never sent to the client
//! - The unmatched-path message keeps the familiar `Cannot <METHOD> <path>` form

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("malformed {kind} body: {reason}")]
    MalformedBody { kind: &'static str, reason: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("session backend unavailable")]
    SessionBackendUnavailable(#[source] StoreError),

    #[error("Cannot {method} {path}")]
    NotFound { method: Method, path: String },

    #[error("no handler is attached under {prefix}")]
    FeatureNotAttached { prefix: &'static str },

    #[error("{0} is not available on this route")]
    MissingExtension(&'static str),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedBody { .. } => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::SessionBackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::FeatureNotAttached { .. } => StatusCode::NOT_IMPLEMENTED,
            GatewayError::MissingExtension(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MalformedBody { .. } => "MALFORMED_BODY",
            GatewayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            GatewayError::SessionBackendUnavailable(_) => "SESSION_BACKEND_UNAVAILABLE",
            GatewayError::NotFound { .. } => "NOT_FOUND",
            GatewayError::FeatureNotAttached { .. } => "FEATURE_NOT_ATTACHED",
            GatewayError::MissingExtension(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            GatewayError::SessionBackendUnavailable(source) => {
                tracing::error!(error = %source, "Session backend failure");
                self.to_string()
            }
            GatewayError::MissingExtension(name) => {
                tracing::error!(extension = name, "Handler mounted outside the session pipeline");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}
