//! Response serialization.
//!
//! # Responsibilities
//! - Build status line, Content-Type and Content-Length
//! - Write the serialized response to the client
//!
//! # Design Decisions
//! - Every response closes the connection (`Connection: close`)
//! - Content-Length is always derived from the body, never set by handlers

use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
pub const TEXT_HTML: &str = "text/html; charset=UTF-8";

/// A complete response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn text(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, TEXT_PLAIN, body)
    }

    pub fn html(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, TEXT_HTML, body)
    }

    /// `200 OK` with body `OK`, the capture acknowledgement.
    pub fn ok() -> Self {
        Self::text(StatusCode::OK, "OK")
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::text(status, Vec::new())
    }

    pub fn bad_request(message: impl Into<Vec<u8>>) -> Self {
        Self::text(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden() -> Self {
        Self::text(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn not_found(message: impl Into<Vec<u8>>) -> Self {
        Self::text(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn internal_error(message: impl Into<Vec<u8>>) -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// `HTTP/1.1 <code> <reason>`
    pub fn status_line(&self) -> String {
        format!(
            "HTTP/1.1 {} {}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )
    }

    /// Status line and headers, including the blank line.
    pub fn head(&self) -> String {
        format!(
            "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status_line(),
            self.content_type,
            self.body.len()
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = self.head();
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(self.head().as_bytes()).await?;
        writer.write_all(&self.body).await?;
        writer.flush().await
    }
}
