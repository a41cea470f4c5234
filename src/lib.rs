//! Local HTTP capture listener.
//!
//! Serves static files, answers a small arithmetic endpoint, and records
//! incoming requests (with multipart attachments) to disk.

// Core subsystems
pub mod config;
pub mod handlers;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

// `http` also names the external crate, so re-exports go through `crate::`.
pub use crate::config::ServerConfig;
pub use crate::handlers::App;
pub use crate::http::HttpServer;
pub use crate::lifecycle::Shutdown;
