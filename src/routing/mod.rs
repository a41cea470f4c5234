//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed Request (method, path, query presence, content type)
//!     → router.rs (route lookup in priority order)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: exactly one RouteTarget
//!
//! Route Compilation (at startup):
//!     RoutesConfig
//!     → dynamic (GET + prefix + '?'), static (GET),
//!       multipart-capture (POST + multipart), capture (POST)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins; order is part of the contract

pub mod matcher;
pub mod router;

pub use router::{Route, RouteMatch, RouteTarget, Router};
