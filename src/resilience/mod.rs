//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → timeouts.rs (read deadline over request assembly)
//!     → handler
//!     → timeouts.rs (write deadline over the response)
//! ```
//!
//! # Design Decisions
//! - Every socket operation on a client connection has a deadline
//! - A slow or silent client costs one task and one permit, never the accept loop

pub mod timeouts;

pub use timeouts::{with_deadline, TimeoutError};
