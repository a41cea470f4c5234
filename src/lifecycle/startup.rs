//! Startup orchestration.
//!
//! # Responsibilities
//! - Prepare the output directory
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until a shutdown signal
//! - Drain in-flight connections before returning
//!
//! # Design Decisions
//! - Fail fast: output directory and bind errors are fatal
//! - Listener binds last (traffic only when ready)
//! - Draining has a deadline; stragglers are abandoned

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// How long in-flight connections get after shutdown is triggered.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create output directory {}: {source}", path.display())]
    OutDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// A bound server that has not started accepting yet.
pub struct Prepared {
    pub server: HttpServer,
    pub listener: Listener,
}

impl Prepared {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until `shutdown` fires, then drain.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) {
        self.server.run(self.listener, shutdown).await;

        let active = self.server.tracker().active_count();
        if active > 0 {
            tracing::info!(active_connections = active, "Draining connections");
        }
        if !self.server.tracker().wait_for_drain(DRAIN_TIMEOUT).await {
            tracing::warn!(
                active_connections = self.server.tracker().active_count(),
                "Drain deadline exceeded; abandoning connections"
            );
        }
    }
}

/// Create the output directory and bind the listener.
pub async fn prepare(config: &ServerConfig) -> Result<Prepared, StartupError> {
    let out_dir = &config.directories.out_dir;
    std::fs::create_dir_all(out_dir).map_err(|source| StartupError::OutDir {
        path: out_dir.clone(),
        source,
    })?;

    let server = HttpServer::new(config);
    let listener = Listener::bind(&config.listener).await?;

    tracing::info!(
        www_dir = %config.directories.www_dir.display(),
        out_dir = %out_dir.display(),
        dynamic_prefix = config.routes.dynamic_prefix.as_deref().unwrap_or(""),
        "Server configured"
    );

    Ok(Prepared { server, listener })
}

/// Run the server until Ctrl+C or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let observability = &config.observability;
    if observability.metrics_enabled {
        let addr: SocketAddr = observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let prepared = prepare(&config).await?;
    if let Ok(addr) = prepared.local_addr() {
        tracing::info!(address = %addr, "Server started");
    }

    let shutdown = Shutdown::new();
    let serving = prepared.serve(shutdown.subscribe());
    tokio::pin!(serving);

    tokio::select! {
        _ = &mut serving => {}
        _ = signals::wait_for_shutdown_signal() => {
            shutdown.trigger();
            serving.await;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
