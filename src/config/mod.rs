//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay environment variables)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → PipelineOptions handed to the pipeline factory
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    CorsOrigin, GatewayConfig, LogFormat, ObservabilityConfig, PipelineOptions, ServerConfig,
    SessionConfig, StoreBackend, StoreConfig,
};
pub use validation::ValidationError;
