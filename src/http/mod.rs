//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/ (origin policy → session → body decoder → logger)
//!     → [routing layer picks a collaborator or static file]
//!     → response.rs (gateway-generated errors as JSON)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ParsedBody, RequestContext, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::{build_pipeline, HttpServer};
