//! Connection serving.
//!
//! # Responsibilities
//! - Run the accept loop until shutdown
//! - Spawn one task per connection, holding its connection permit
//! - Read one request under the read deadline
//! - Dispatch on the blocking pool and catch handler panics
//! - Write the response under the write deadline, then close
//!
//! # Design Decisions
//! - One request per connection (`Connection: close`)
//! - An error in one connection is logged and never stops the accept loop
//! - Truncated messages get 400 and never reach a handler

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::handlers::App;
use crate::http::reader::{read_request, Framing, ReadError};
use crate::http::{Request, Response, UNKNOWN_METHOD};
use crate::net::{ConnectionId, ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::resilience::timeouts::{with_deadline, TimeoutError};
use crate::security::RequestLimits;

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("failed to write response: {0}")]
    Write(#[source] std::io::Error),

    #[error("handler task failed: {0}")]
    Handler(#[from] tokio::task::JoinError),
}

/// HTTP/1.1 server for the capture listener.
///
/// Cheap to clone; every connection task holds its own copy.
#[derive(Clone)]
pub struct HttpServer {
    app: Arc<App>,
    limits: RequestLimits,
    read_timeout: Duration,
    write_timeout: Duration,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a server with filesystem-backed handlers.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_app(config, Arc::new(App::from_config(config)))
    }

    pub fn with_app(config: &ServerConfig, app: Arc<App>) -> Self {
        Self {
            app,
            limits: RequestLimits::from(&config.limits),
            read_timeout: Duration::from_secs(config.timeouts.read_secs),
            write_timeout: Duration::from_secs(config.timeouts.write_secs),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Connections already accepted keep running; use the tracker to drain them.
    pub async fn run(&self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "HTTP server starting");
        }

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    continue;
                }
            };

            let guard = self.tracker.track();
            let server = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let id = guard.id();
                if let Err(e) = server.serve_connection(stream, peer, id).await {
                    tracing::warn!(
                        connection_id = %id,
                        peer_addr = %peer,
                        error = %e,
                        "Connection ended with error"
                    );
                }
                drop(guard);
            });
        }

        tracing::info!("HTTP server stopped accepting");
    }

    /// Serve exactly one request on `stream` and close it.
    pub async fn serve_connection<S>(
        &self,
        mut stream: S,
        peer: SocketAddr,
        id: ConnectionId,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let started = Instant::now();

        let read = with_deadline("read", self.read_timeout, read_request(&mut stream, self.limits));
        let raw = match read.await? {
            Ok(raw) => raw,
            Err(e) => {
                let response = match e {
                    ReadError::HeadersTooLarge { .. } => Response::text(
                        StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                        "Request header fields too large",
                    ),
                    ReadError::BodyTooLarge { .. } => {
                        Response::text(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
                    }
                    ReadError::Io(_) => return Err(e.into()),
                };
                self.respond(&mut stream, &response).await?;
                metrics::record_request(UNKNOWN_METHOD, "none", response.status.as_u16(), started);
                return Err(e.into());
            }
        };

        if raw.is_empty() {
            tracing::debug!(connection_id = %id, peer_addr = %peer, "Closed before sending a request");
            return Ok(());
        }

        tracing::info!(
            connection_id = %id,
            peer_addr = %peer,
            request_line = %raw.request_line(),
            bytes = raw.bytes.len(),
            "Request"
        );

        let (method, route, response) = match raw.framing {
            Framing::Complete => {
                let app = Arc::clone(&self.app);
                let dispatched = tokio::task::spawn_blocking(move || {
                    let req = Request::parse(&raw.bytes);
                    let (matched, response) = app.dispatch(&req, &raw.bytes);
                    (req.method, matched.name, response)
                })
                .await;

                match dispatched {
                    Ok(done) => done,
                    Err(e) => {
                        tracing::error!(connection_id = %id, error = %e, "Handler panicked");
                        let response = Response::internal_error("Internal server error");
                        self.respond(&mut stream, &response).await?;
                        return Err(e.into());
                    }
                }
            }
            Framing::Unterminated => {
                tracing::warn!(connection_id = %id, "Peer closed before end of headers");
                let method = Request::parse(&raw.bytes).method;
                (method, "none", Response::bad_request("Incomplete request"))
            }
            Framing::ShortBody { expected, received } => {
                tracing::warn!(
                    connection_id = %id,
                    expected,
                    received,
                    "Peer closed before end of body"
                );
                let method = Request::parse(&raw.bytes).method;
                (method, "none", Response::bad_request("Incomplete request body"))
            }
        };

        tracing::info!(
            connection_id = %id,
            method = %method,
            route,
            status = response.status.as_u16(),
            "Response"
        );
        metrics::record_request(&method, route, response.status.as_u16(), started);
        self.respond(&mut stream, &response).await
    }

    async fn respond<S>(&self, stream: &mut S, response: &Response) -> Result<(), ConnectionError>
    where
        S: AsyncWrite + Unpin,
    {
        with_deadline("write", self.write_timeout, response.write_to(stream))
            .await?
            .map_err(ConnectionError::Write)?;
        // Best effort; the peer may already be gone.
        let _ = stream.shutdown().await;
        Ok(())
    }
}
