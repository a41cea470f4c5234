//! Capture listener binary.
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::reader ──▶ http::request
//!                                                     │
//!                                                     ▼
//!                                            routing::router
//!                      ┌────────────┬───────────────┼──────────────┐
//!                      ▼            ▼               ▼              ▼
//!                 arithmetic   static_files     capture       fallback
//!                                  │           (out_dir)     (200 / 405)
//!                               listing
//!                                                     │
//!     Client ◀────────────────────── http::response ◀─┘
//! ```

use clap::Parser;

use capture_listener::config::CliArgs;
use capture_listener::lifecycle;
use capture_listener::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = args.resolve()?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?args.config,
        "capture-listener starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        read_timeout_secs = config.timeouts.read_secs,
        directory_listing = config.debug.directory_listing,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}
