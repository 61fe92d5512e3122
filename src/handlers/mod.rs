//! Handlers owned by the gateway itself.
//!
//! - `health.rs`: liveness probe, mounted ahead of the session stage
//! - `fallback.rs`: welcome text and 404 for requests nothing else claims
//! - `session.rs`: built-in collaborator under `/session`
//! - `unattached.rs`: 501 placeholder for feature prefixes with no collaborator

pub mod fallback;
pub mod health;
pub mod session;
pub mod unattached;
