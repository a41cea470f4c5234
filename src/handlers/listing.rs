//! Debug directory listing.
//!
//! Rendered from `std::fs::read_dir` metadata. Only wired in when
//! `debug.directory_listing` is set; the page says so in a banner.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use http::StatusCode;

use crate::http::Response;
use crate::security::resolve_within;

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Renders a directory under the served root.
pub trait DirectoryLister: Send + Sync {
    /// Full response for a directory request path.
    fn render(&self, request_path: &str) -> Response;
}

#[derive(Debug, Clone)]
pub struct FsDirectoryLister {
    root: PathBuf,
}

impl FsDirectoryLister {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a request path to an existing directory under the root.
    fn target(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/').trim_end_matches('/');
        let dir = resolve_within(&self.root, relative)?;
        dir.is_dir().then_some(dir)
    }
}

impl DirectoryLister for FsDirectoryLister {
    fn render(&self, request_path: &str) -> Response {
        let Some(dir) = self.target(request_path) else {
            tracing::info!(path = %request_path, "Directory not found");
            return Response::not_found("Directory not found");
        };

        tracing::warn!(
            path = %request_path,
            dir = %dir.display(),
            "Directory listing served (local debug only)"
        );

        match read_entries(&dir) {
            Ok(entries) => Response::html(StatusCode::OK, render_page(request_path, &entries)),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Directory listing failed");
                Response::internal_error("Error listing directory")
            }
        }
    }
}

/// Entries of `dir`, sorted by name.
pub fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render_page(request_path: &str, entries: &[ListingEntry]) -> String {
    let title = if request_path.is_empty() { "/" } else { request_path };
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<title>Directory Listing - LOCAL DEBUG ONLY</title>\n</head>\n<body>\n");
    html.push_str("<h1 style='color:red;'>LOCAL DEVELOPMENT ONLY</h1>\n");
    html.push_str(
        "<p><strong>This feature is for local debugging only and should never be enabled in production.</strong></p>\n",
    );
    let _ = writeln!(html, "<h2>Directory: {}</h2>", escape_html(title));
    html.push_str("<table>\n<tr><th>Name</th><th>Type</th><th>Size</th></tr>\n");
    for entry in entries {
        let kind = if entry.is_dir { "dir" } else { "file" };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&entry.name),
            kind,
            entry.size
        );
    }
    html.push_str("</table>\n<p><a href='/'>Back to home</a></p>\n</body>\n</html>");
    html
}
