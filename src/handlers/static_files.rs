//! Static file serving from the www root.
//!
//! # Responsibilities
//! - Map URL paths onto files under the root (`/` is `/index.html`)
//! - Refuse anything that normalizes outside the root
//! - Pick a MIME type from the file extension
//! - Hand directory requests to the lister
//!
//! # Design Decisions
//! - A path with no `.` in it is treated as a directory request
//! - Containment is checked lexically before the filesystem is touched

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;

use crate::handlers::listing::DirectoryLister;
use crate::http::Response;
use crate::security::resolve_within;

/// Why a URL path did not produce file contents.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("not found")]
    NotFound,

    #[error("{} is a directory", .0.display())]
    Directory(PathBuf),

    #[error("path escapes the served root")]
    Forbidden,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Bytes of a served file and the type they are served as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

/// Source of static content.
pub trait FileServer: Send + Sync {
    /// Look up a URL path (leading `/` included).
    fn load(&self, url_path: &str) -> Result<StaticFile, FileError>;
}

/// Serves files from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsFileServer {
    root: PathBuf,
}

impl FsFileServer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileServer for FsFileServer {
    fn load(&self, url_path: &str) -> Result<StaticFile, FileError> {
        let path = resolve_within(&self.root, url_path).ok_or(FileError::Forbidden)?;

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(FileError::NotFound),
            Err(source) => return Err(FileError::Io { path, source }),
        };
        if metadata.is_dir() {
            return Err(FileError::Directory(path));
        }

        match std::fs::read(&path) {
            Ok(bytes) => Ok(StaticFile {
                mime: mime_type(&path),
                path,
                bytes,
            }),
            Err(source) => Err(FileError::Io { path, source }),
        }
    }
}

/// MIME type by extension, `application/octet-stream` when unknown.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=UTF-8",
        "js" => "application/javascript; charset=UTF-8",
        "css" => "text/css; charset=UTF-8",
        "txt" => "text/plain; charset=UTF-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// GET handler for everything outside the dynamic prefix.
pub struct StaticFileHandler {
    files: Arc<dyn FileServer>,
    lister: Option<Arc<dyn DirectoryLister>>,
}

impl StaticFileHandler {
    /// `lister` is `None` when directory listing is disabled.
    pub fn new(files: Arc<dyn FileServer>, lister: Option<Arc<dyn DirectoryLister>>) -> Self {
        Self { files, lister }
    }

    pub fn handle(&self, path: &str) -> Response {
        let path = if path == "/" { "/index.html" } else { path };
        let directory_request = !path.contains('.');

        match self.files.load(path) {
            Ok(file) => {
                tracing::info!(
                    path = %path,
                    mime = file.mime,
                    bytes = file.bytes.len(),
                    "Static 200"
                );
                Response::new(StatusCode::OK, file.mime, file.bytes)
            }
            Err(FileError::Forbidden) => {
                tracing::warn!(path = %path, "Path traversal rejected");
                Response::forbidden()
            }
            Err(FileError::NotFound) if directory_request => self.listing(path),
            Err(FileError::NotFound) => {
                tracing::info!(path = %path, "Static 404");
                Response::not_found("Not found")
            }
            Err(FileError::Directory(_)) => self.listing(path),
            Err(e @ FileError::Io { .. }) => {
                tracing::error!(path = %path, error = %e, "Error reading file");
                Response::internal_error("Error reading file")
            }
        }
    }

    fn listing(&self, path: &str) -> Response {
        match &self.lister {
            Some(lister) => lister.render(path),
            None => {
                tracing::info!(path = %path, "Directory listing disabled");
                Response::not_found("Directory not found")
            }
        }
    }
}
