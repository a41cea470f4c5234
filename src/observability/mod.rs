//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Structured fields (connection_id, method, path, route, status) on every event
//! - Metrics are cheap (atomic increments) and off unless enabled

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
