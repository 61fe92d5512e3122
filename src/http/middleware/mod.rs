//! Pipeline stages, in the order a request meets them.
//!
//! ```text
//! origin.rs   → preflight answered here; CORS headers on everything else
//! session.rs  → Session attached, persisted after the response
//! body.rs     → ParsedBody attached, 400/413 on bad bodies
//! logger.rs   → one log line
//! ```

pub mod body;
pub mod logger;
pub mod origin;
pub mod session;

pub use body::{decode_body, BodyLimit};
pub use logger::log_request;
pub use origin::{apply_origin_policy, OriginPolicy};
pub use session::establish_session;
