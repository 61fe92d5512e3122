//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → cookie.rs (find the session cookie by name)
//!     → token.rs (verify HMAC signature, recover SessionId)
//!     → store/ (load live record; expired or unknown ⇒ none)
//!     → handle.rs (Session attached to the request, fresh if none)
//!     → [collaborator reads/writes the session]
//!     → handle.rs (commit: delete / save / touch, cookie directive)
//!     → store/ (durable write) + cookie.rs (Set-Cookie)
//! ```
//!
//! # Design Decisions
//! - Lazy creation: an untouched new session is never persisted
//! - Invalid, tampered and expired tokens are all "no session", never errors
//! - Backend failures are surfaced to the caller, never swallowed

pub mod cookie;
pub mod handle;
pub mod manager;
pub mod record;
pub mod store;
pub mod token;

pub use cookie::{CookiePolicy, CookieScope};
pub use handle::Session;
pub use manager::SessionManager;
pub use record::SessionRecord;
pub use store::{MemoryStore, SessionStore, SqliteStore, StoreError};
pub use token::{SessionId, SessionSigner};
