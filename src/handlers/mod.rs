//! Request handlers.
//!
//! # Data Flow
//! ```text
//! Request + raw bytes
//!     → App::dispatch
//!         → [GET] record as GET_<ts>_<n>.txt (capture.rs)
//!         → Router::match_request
//!     → arithmetic.rs    (dynamic prefix + query)
//!     → static_files.rs  (GET, with listing.rs for directories)
//!     → capture.rs       (POST, plain or multipart)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous and run on the blocking pool
//! - Filesystem access goes through `FileServer`, `DirectoryLister` and
//!   `RequestStore` so tests can swap them out
//! - A capture that cannot be persisted is a 500; a GET that cannot be
//!   recorded is still served

pub mod arithmetic;
pub mod capture;
pub mod listing;
pub mod static_files;

use std::sync::Arc;

use http::StatusCode;

use crate::config::ServerConfig;
use crate::http::multipart::MultipartDecoder;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTarget, Router};

pub use capture::{Attachment, CaptureRecord, FsRequestStore, RequestStore, StoreError};
pub use listing::{DirectoryLister, FsDirectoryLister};
pub use static_files::{FileError, FileServer, FsFileServer, StaticFileHandler};

/// Everything a connection needs to turn a request into a response.
///
/// Built once at startup and shared behind an `Arc`.
pub struct App {
    router: Router,
    static_files: StaticFileHandler,
    store: Arc<dyn RequestStore>,
    record_get_requests: bool,
}

impl App {
    /// Wire filesystem-backed capabilities from configuration.
    pub fn from_config(config: &ServerConfig) -> Self {
        let www = &config.directories.www_dir;
        let lister: Option<Arc<dyn DirectoryLister>> = if config.debug.directory_listing {
            tracing::warn!("Directory listing enabled; do not expose this server");
            Some(Arc::new(FsDirectoryLister::new(www)))
        } else {
            None
        };

        Self::with_capabilities(
            config,
            Arc::new(FsFileServer::new(www)),
            lister,
            Arc::new(FsRequestStore::new(&config.directories.out_dir)),
        )
    }

    pub fn with_capabilities(
        config: &ServerConfig,
        files: Arc<dyn FileServer>,
        lister: Option<Arc<dyn DirectoryLister>>,
        store: Arc<dyn RequestStore>,
    ) -> Self {
        Self {
            router: Router::from_config(&config.routes),
            static_files: StaticFileHandler::new(files, lister),
            store,
            record_get_requests: config.capture.record_get_requests,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Route `req` and run its handler. `raw` is the request exactly as read.
    pub fn dispatch(&self, req: &Request, raw: &[u8]) -> (RouteMatch, Response) {
        if req.method == "GET" && self.record_get_requests {
            if let Err(e) = self.store.save_text(&req.method, raw) {
                tracing::error!(error = %e, "Failed to record GET request");
            }
        }

        let matched = self.router.match_request(req);
        tracing::debug!(route = matched.name, path = %req.path, "Route chosen");

        let response = match matched.target {
            RouteTarget::Arithmetic => arithmetic::handle(&req.query),
            RouteTarget::StaticFile => self.static_files.handle(&req.path),
            RouteTarget::PlainCapture => self.capture(req, raw, false),
            RouteTarget::MultipartCapture => self.capture(req, raw, true),
            RouteTarget::Acknowledge => Response::empty(StatusCode::OK),
            RouteTarget::MethodNotAllowed => Response::method_not_allowed(),
        };
        (matched, response)
    }

    fn capture(&self, req: &Request, raw: &[u8], multipart: bool) -> Response {
        let result = if multipart {
            let form = match MultipartDecoder::from_content_type(req.content_type().unwrap_or("")) {
                Ok(decoder) => decoder.decode(&req.body),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping attachment extraction");
                    Default::default()
                }
            };
            let attachments: Vec<Attachment<'_>> = form
                .files()
                .filter_map(|part| {
                    Some(Attachment {
                        filename: part.filename.as_deref()?,
                        content: &part.content,
                    })
                })
                .collect();
            let result = self.store.save_capture(&req.method, raw, Some(&attachments));
            if let Ok(record) = &result {
                metrics::record_capture("multipart");
                metrics::record_attachments(record.attachments.len());
            }
            result
        } else {
            let result = self.store.save_capture(&req.method, raw, None);
            if result.is_ok() {
                metrics::record_capture("plain");
            }
            result
        };

        match result {
            Ok(_) => Response::ok(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist capture");
                Response::internal_error("Failed to store request")
            }
        }
    }
}
