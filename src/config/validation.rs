//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce production-only requirements (explicit session secret)
//! - Validate value ranges (timeouts > 0, port valid)
//! - Reject CORS settings that could degrade into a wildcard
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{GatewayConfig, StoreBackend, DEVELOPMENT_SECRET};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("session secret must be set explicitly in production")]
    MissingSecret,

    #[error("durable session store requires a connection string")]
    MissingStoreUrl,

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("session cookie name '{0}' is not a valid cookie token")]
    InvalidCookieName(String),

    #[error("CORS origin '{0}' is not allowed (empty or wildcard)")]
    InvalidOrigin(String),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.production
        && (config.session.secret.is_empty() || config.session.secret == DEVELOPMENT_SECRET)
    {
        errors.push(ValidationError::MissingSecret);
    }

    if config.store.backend == StoreBackend::Durable && config.store.url.trim().is_empty() {
        errors.push(ValidationError::MissingStoreUrl);
    }

    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let positive: [(&'static str, u64); 7] = [
        ("server.request_timeout_secs", config.server.request_timeout_secs),
        ("server.max_body_bytes", config.server.max_body_bytes as u64),
        ("session.ttl_secs", config.session.ttl_secs),
        ("session.purge_interval_secs", config.session.purge_interval_secs),
        ("store.connect_timeout_secs", config.store.connect_timeout_secs),
        ("store.connect_attempts", u64::from(config.store.connect_attempts)),
        ("store.op_timeout_ms", config.store.op_timeout_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NonPositive { field });
        }
    }

    let name = &config.session.cookie_name;
    if name.is_empty() || !name.bytes().all(is_cookie_token_byte) {
        errors.push(ValidationError::InvalidCookieName(name.clone()));
    }

    for origin in &config.cors.origins {
        let trimmed = origin.trim();
        if trimmed.is_empty() || trimmed.contains('*') {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_cookie_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
