//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup store connection:
//!     → timeouts.rs (bound each attempt)
//!     → On failure: backoff.rs (delay before the next attempt, if any remain)
//!
//! Per-request store operation:
//!     → timeouts.rs (bound the operation; elapsed ⇒ backend unavailable)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every store call has a deadline
//! - Startup retries are opt-in; the default is fail-fast
//! - No retries inside a request: the client sees a 5xx and may retry itself

pub mod backoff;
pub mod timeouts;
