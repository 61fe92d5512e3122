//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap store calls and connection attempts with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped operation did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .after.as_millis())]
pub struct TimedOut {
    pub after: Duration,
}

/// Run `fut`, giving up after `after`.
pub async fn with_deadline<F>(after: Duration, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| TimedOut { after })
}
