//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (check header block and declared body size while reading)
//!     → paths.rs (static lookups stay inside the served root)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input (paths, filenames, lengths)

pub mod limits;
pub mod paths;

pub use limits::RequestLimits;
pub use paths::{normalize, resolve_within};
