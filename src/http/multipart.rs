//! multipart/form-data decoding.
//!
//! The whole body is already buffered, so decoding splits it on the literal
//! `--<boundary>` delimiter rather than running a streaming state machine. The
//! boundary is only ever compared as an exact byte string.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::http::request::{find_bytes, split_lines, Headers};

/// Errors that prevent decoding a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultipartError {
    #[error("no boundary in Content-Type header")]
    MissingBoundary,
}

/// One decoded part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub headers: Headers,
    /// Form field name from Content-Disposition.
    pub name: Option<String>,
    /// Present iff the part is a file upload.
    pub filename: Option<String>,
    pub content: Vec<u8>,
}

impl MultipartPart {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

/// All non-empty parts of a multipart body, in body order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<MultipartPart>,
}

impl MultipartForm {
    pub fn files(&self) -> impl Iterator<Item = &MultipartPart> {
        self.parts.iter().filter(|p| p.is_file())
    }

    pub fn fields(&self) -> impl Iterator<Item = &MultipartPart> {
        self.parts.iter().filter(|p| !p.is_file())
    }

    /// Content of the first non-file field called `name`.
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.fields()
            .find(|p| p.name.as_deref() == Some(name))
            .map(|p| p.content.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Pull the `boundary` parameter out of a Content-Type value.
///
/// Only a parameter named exactly `boundary` (any case) counts. The value runs
/// to the next `;`, is trimmed, and loses surrounding quotes.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    header_param(content_type, "boundary").filter(|value| !value.is_empty())
}

/// Splits a buffered multipart body into parts.
#[derive(Debug, Clone)]
pub struct MultipartDecoder {
    boundary: String,
    delimiter: Vec<u8>,
}

impl MultipartDecoder {
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            boundary: boundary.to_string(),
            delimiter,
        }
    }

    /// Build a decoder from a request's Content-Type header value.
    pub fn from_content_type(content_type: &str) -> Result<Self, MultipartError> {
        extract_boundary(content_type)
            .map(|b| Self::new(&b))
            .ok_or(MultipartError::MissingBoundary)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Decode every part with non-blank content.
    pub fn decode(&self, body: &[u8]) -> MultipartForm {
        let mut parts = Vec::new();
        let mut unnamed = 0usize;

        for segment in split_on(body, &self.delimiter) {
            if is_blank(segment) || segment.starts_with(b"--") {
                continue;
            }
            let Some((header_block, content)) = split_part(segment) else {
                continue;
            };
            if is_blank(content) {
                continue;
            }

            let header_text = String::from_utf8_lossy(header_block);
            let headers = Headers::parse_lines(split_lines(&header_text));
            let disposition = headers.get("content-disposition").unwrap_or("");

            let filename = if disposition.contains("filename=") {
                Some(quoted_filename(disposition).unwrap_or_else(|| {
                    unnamed += 1;
                    unnamed_filename(unnamed)
                }))
            } else {
                None
            };
            let name = header_param(disposition, "name");

            parts.push(MultipartPart {
                name,
                filename,
                content: content.to_vec(),
                headers,
            });
        }

        MultipartForm { parts }
    }
}

/// Name for a file part whose filename could not be read.
pub fn unnamed_filename(index: usize) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    if index <= 1 {
        format!("unnamed_file_{}", millis)
    } else {
        format!("unnamed_file_{}_{}", millis, index)
    }
}

fn split_on<'b>(body: &'b [u8], delimiter: &[u8]) -> Vec<&'b [u8]> {
    let mut segments = Vec::new();
    let mut rest = body;
    while let Some(pos) = find_bytes(rest, delimiter) {
        segments.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    segments.push(rest);
    segments
}

/// Split a segment at its header/body separator and strip one trailing line
/// terminator from the content.
fn split_part(segment: &[u8]) -> Option<(&[u8], &[u8])> {
    let (pos, sep_len) = match find_bytes(segment, b"\r\n\r\n") {
        Some(pos) => (pos, 4),
        None => (find_bytes(segment, b"\n\n")?, 2),
    };
    let content = &segment[pos + sep_len..];
    let content = content
        .strip_suffix(b"\r\n")
        .or_else(|| content.strip_suffix(b"\n"))
        .unwrap_or(content);
    Some((&segment[..pos], content))
}

/// The quoted string after `filename="`. `None` if unquoted, unterminated or empty.
fn quoted_filename(disposition: &str) -> Option<String> {
    let start = disposition.find("filename=\"")? + "filename=\"".len();
    let len = disposition[start..].find('"')?;
    if len == 0 {
        return None;
    }
    Some(disposition[start..start + len].to_string())
}

/// Value of a `key=value` / `key="value"` parameter after the first `;` of a
/// header value.
fn header_param(value: &str, key: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        if !k.trim().eq_ignore_ascii_case(key) {
            return None;
        }
        let v = v.trim();
        let v = v.strip_prefix('"').unwrap_or(v);
        let v = v.strip_suffix('"').unwrap_or(v);
        Some(v.to_string())
    })
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
