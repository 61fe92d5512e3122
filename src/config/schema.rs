//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Secret used when none is configured outside production.
pub const DEVELOPMENT_SECRET: &str = "keyboard_cat";

/// Root configuration for the chat gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and request handling settings.
    pub server: ServerConfig,

    /// Session cookie and lifetime settings.
    pub session: SessionConfig,

    /// Durable store connection settings.
    pub store: StoreConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Options handed to the pipeline factory.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            trust_proxy: self.server.trust_proxy(),
            session_store: self.store.backend,
            cors_origin: self.cors.origin_mode(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listening port.
    pub port: u16,

    /// Production mode: alters cookie security attributes and proxy trust.
    pub production: bool,

    /// Trust `X-Forwarded-*` headers from a reverse proxy.
    /// Unset means "follow the production flag".
    pub trust_proxy: Option<bool>,

    /// Directory served for requests no feature route claims.
    pub public_dir: String,

    /// Whole-request deadline in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Effective proxy trust.
    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy.unwrap_or(self.production)
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            production: false,
            trust_proxy: None,
            public_dir: "public".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 100 * 1024,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name carrying the session token.
    pub cookie_name: String,

    /// Secret used to sign session tokens. Empty means "not configured".
    pub secret: String,

    /// Retired secrets still accepted when verifying cookies.
    pub previous_secrets: Vec<String>,

    /// Session lifetime in seconds.
    pub ttl_secs: u64,

    /// How often expired sessions are purged from the store.
    pub purge_interval_secs: u64,
}

impl SessionConfig {
    /// The signing secret, falling back to the development secret.
    pub fn signing_secret(&self) -> &str {
        if self.secret.is_empty() {
            DEVELOPMENT_SECRET
        } else {
            &self.secret
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            secret: String::new(),
            previous_secrets: Vec::new(),
            ttl_secs: 24 * 60 * 60,
            purge_interval_secs: 600,
        }
    }
}

/// Which session store backs the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; sessions die with the process.
    Memory,
    /// SQLite database shared by every gateway pointing at it.
    Durable,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "durable" | "sqlite" => Ok(StoreBackend::Durable),
            other => Err(format!("unknown session store '{other}'")),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection.
    pub backend: StoreBackend,

    /// Connection string for the durable backend (e.g., "sqlite://sessions.db").
    pub url: String,

    /// Deadline for one connection attempt, in seconds.
    pub connect_timeout_secs: u64,

    /// Number of connection attempts at startup (1 = fail fast).
    pub connect_attempts: u32,

    /// Base delay between connection attempts in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between connection attempts in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Deadline for a single store operation in milliseconds.
    pub op_timeout_ms: u64,

    /// Reader pool size for the durable backend.
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Durable,
            url: "sqlite://sessions.db".to_string(),
            connect_timeout_secs: 5,
            connect_attempts: 1,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 5000,
            op_timeout_ms: 5000,
            max_connections: 8,
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Explicit allow list. Empty means every origin is reflected.
    pub origins: Vec<String>,
}

impl CorsConfig {
    pub fn origin_mode(&self) -> CorsOrigin {
        if self.origins.is_empty() {
            CorsOrigin::ReflectAll
        } else {
            CorsOrigin::List(self.origins.clone())
        }
    }
}

/// How the origin policy decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    /// Every non-empty origin is echoed back.
    ReflectAll,
    /// Only the listed origins are echoed back.
    List(Vec<String>),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Options for the single pipeline factory, one set per deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub trust_proxy: bool,
    pub session_store: StoreBackend,
    pub cors_origin: CorsOrigin,
}
