//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request past the logger
//!     → router.rs (feature prefix owns the path?)
//!         yes → collaborator router (prefix stripped), or 501 placeholder
//!         no  → statics.rs (file under the public directory?)
//!                   yes → file
//!                   no  → welcome text on "/", otherwise 404
//! ```
//!
//! # Design Decisions
//! - Collaborators are assembled at startup, immutable at runtime
//! - Feature routes always win over static files

pub mod router;
pub mod statics;

pub use router::{Collaborators, Feature};
pub use statics::with_static_fallback;
