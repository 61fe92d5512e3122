//! Chat gateway library.
//!
//! The HTTP entry point for the chat application: every request passes
//! through a fixed pipeline before reaching a feature handler.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod session;

pub use config::schema::GatewayConfig;
pub use http::{build_pipeline, RequestContext};
pub use lifecycle::{Gateway, RunningGateway, StartupError, StartupState};
pub use routing::{Collaborators, Feature};
