//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, LogFormat, StoreBackend};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Build the effective configuration: optional file, then process environment.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GatewayConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay recognized environment variables onto `config`.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(env) = get("APP_ENV").or_else(|| get("NODE_ENV")) {
        config.server.production = env.trim().eq_ignore_ascii_case("production");
    }

    if let Some(port) = get("PORT") {
        config.server.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::Env { var: "PORT", reason: e.to_string() }
        })?;
    }

    if let Some(host) = get("HOST") {
        config.server.host = host;
    }

    if let Some(flag) = get("TRUST_PROXY") {
        config.server.trust_proxy = Some(parse_bool("TRUST_PROXY", &flag)?);
    }

    if let Some(dir) = get("PUBLIC_DIR") {
        config.server.public_dir = dir;
    }

    if let Some(secret) = get("SESSION_SECRET") {
        config.session.secret = secret;
    }

    if let Some(name) = get("SESSION_COOKIE_NAME") {
        config.session.cookie_name = name;
    }

    if let Some(backend) = get("SESSION_STORE") {
        config.store.backend = backend
            .parse::<StoreBackend>()
            .map_err(|reason| ConfigError::Env { var: "SESSION_STORE", reason })?;
    }

    if let Some(url) = get("DATABASE_URL") {
        config.store.url = url;
    }

    if let Some(origins) = get("CORS_ORIGIN") {
        config.cors.origins = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
    }

    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    if let Some(format) = get("LOG_FORMAT") {
        config.observability.log_format = match format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    reason: format!("expected 'pretty' or 'json', got '{other}'"),
                })
            }
        };
    }

    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Env { var, reason: format!("expected a boolean, got '{other}'") }),
    }
}
