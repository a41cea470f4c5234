//! Request framing.
//!
//! # Responsibilities
//! - Accumulate bytes from a connection until the header terminator is seen
//! - Read exactly the declared Content-Length worth of body bytes
//! - Stop on EOF instead of waiting for bytes that will never come
//!
//! # States
//! ```text
//! Start ──first bytes──▶ Headers ──"\r\n\r\n"──▶ Body { remaining } ──0 left──▶ Done
//!                          │                         │
//!                          └── no body declared ─────┴──────────────────────▶ Done
//! ```
//!
//! # Design Decisions
//! - Reads are capped to the remaining body need, so nothing past the body is consumed
//! - Bytes that arrived with the headers beyond the declared body are dropped
//! - Size limits are enforced while reading, not after

use std::borrow::Cow;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::{content_length_of, find_bytes, HEADER_TERMINATOR};
use crate::security::RequestLimits;

/// Size of each read from the connection.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Errors that abort request assembly.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),

    #[error("header block exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    #[error("declared body of {declared} bytes exceeds {limit} bytes")]
    BodyTooLarge { declared: usize, limit: usize },
}

/// How the message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Headers terminated and the full declared body was read.
    Complete,
    /// The peer closed before the header terminator arrived.
    Unterminated,
    /// The peer closed before the declared body was fully read.
    ShortBody { expected: usize, received: usize },
}

/// The raw bytes of one request as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub bytes: Vec<u8>,
    /// Length of the request line plus headers plus terminator, when seen.
    pub header_len: Option<usize>,
    pub framing: Framing,
}

impl RawRequest {
    /// True when the peer closed without sending anything.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First line of the request, for logging.
    pub fn request_line(&self) -> Cow<'_, str> {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(self.bytes.len());
        String::from_utf8_lossy(&self.bytes[..end])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Start,
    Headers,
    Body { remaining: usize },
    Done,
}

/// Reads one HTTP message from a stream.
pub struct RequestReader<'a, R> {
    inner: &'a mut R,
    limits: RequestLimits,
    buf: Vec<u8>,
    state: ReadState,
    header_len: Option<usize>,
    /// Bytes already searched for the terminator.
    scanned: usize,
}

impl<'a, R> RequestReader<'a, R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: &'a mut R, limits: RequestLimits) -> Self {
        Self {
            inner,
            limits,
            buf: Vec::with_capacity(READ_CHUNK_SIZE),
            state: ReadState::Start,
            header_len: None,
            scanned: 0,
        }
    }

    /// Drive the state machine until the message is complete or the peer closes.
    pub async fn read_request(mut self) -> Result<RawRequest, ReadError> {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            match self.state {
                ReadState::Start | ReadState::Headers => {
                    let n = self.inner.read(&mut chunk).await?;
                    if n == 0 {
                        return Ok(self.finish(Framing::Unterminated));
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                    self.state = ReadState::Headers;
                    self.scan_headers()?;
                }
                ReadState::Body { remaining } => {
                    let want = remaining.min(chunk.len());
                    let n = self.inner.read(&mut chunk[..want]).await?;
                    if n == 0 {
                        let header_len = self.header_len.unwrap_or(0);
                        let received = self.buf.len() - header_len;
                        return Ok(self.finish(Framing::ShortBody {
                            expected: received + remaining,
                            received,
                        }));
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                    self.state = match remaining - n {
                        0 => ReadState::Done,
                        left => ReadState::Body { remaining: left },
                    };
                }
                ReadState::Done => return Ok(self.finish(Framing::Complete)),
            }
        }
    }

    /// Look for the terminator in the newly buffered bytes and pick the next state.
    fn scan_headers(&mut self) -> Result<(), ReadError> {
        // The terminator may straddle two reads.
        let from = self.scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);

        let Some(pos) = find_bytes(&self.buf[from..], HEADER_TERMINATOR) else {
            self.scanned = self.buf.len();
            if !self.limits.header_fits(self.buf.len()) {
                return Err(ReadError::HeadersTooLarge {
                    limit: self.limits.max_header_bytes,
                });
            }
            return Ok(());
        };

        let header_len = from + pos + HEADER_TERMINATOR.len();
        if !self.limits.header_fits(header_len) {
            return Err(ReadError::HeadersTooLarge {
                limit: self.limits.max_header_bytes,
            });
        }
        self.header_len = Some(header_len);

        let declared = content_length_of(&self.buf[..header_len]);
        if !self.limits.body_fits(declared) {
            return Err(ReadError::BodyTooLarge {
                declared,
                limit: self.limits.max_body_bytes,
            });
        }

        let buffered = self.buf.len() - header_len;
        if buffered >= declared {
            self.buf.truncate(header_len + declared);
            self.state = ReadState::Done;
        } else {
            self.state = ReadState::Body {
                remaining: declared - buffered,
            };
        }
        Ok(())
    }

    fn finish(self, framing: Framing) -> RawRequest {
        RawRequest {
            bytes: self.buf,
            header_len: self.header_len,
            framing,
        }
    }
}

/// Read one request from `stream` with the given limits.
pub async fn read_request<R>(stream: &mut R, limits: RequestLimits) -> Result<RawRequest, ReadError>
where
    R: AsyncRead + Unpin,
{
    RequestReader::new(stream, limits).read_request().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Request;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Yields at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Trickle {
        fn new(data: &[u8], step: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                step,
            }
        }
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let end = (self.pos + self.step)
                .min(self.data.len())
                .min(self.pos + buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..end]);
            self.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    const POST: &[u8] =
        b"POST /submit HTTP/1.1\r\nHost: h\r\nContent-Length: 11\r\n\r\nhello world";

    #[tokio::test]
    async fn test_reads_full_message_at_once() {
        let mut stream = POST;
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();

        assert_eq!(raw.framing, Framing::Complete);
        assert_eq!(raw.bytes, POST);
        assert_eq!(raw.header_len, Some(POST.len() - 11));
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_result() {
        let mut whole = POST;
        let expected = read_request(&mut whole, RequestLimits::default()).await.unwrap();

        for step in [1, 2, 3, 5, 7, 16] {
            let mut stream = Trickle::new(POST, step);
            let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
            assert_eq!(raw, expected, "step {}", step);
            assert_eq!(Request::parse(&raw.bytes), Request::parse(&expected.bytes));
            assert_eq!(Request::parse(&raw.bytes).body, b"hello world");
        }
    }

    #[tokio::test]
    async fn test_get_stops_at_terminator() {
        let mut stream: &[u8] = b"GET / HTTP/1.1\r\nHost: h\r\n\r\n";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(raw.framing, Framing::Complete);
        assert_eq!(raw.bytes.len(), raw.header_len.unwrap());
    }

    #[tokio::test]
    async fn test_does_not_consume_past_body() {
        let mut data = POST.to_vec();
        data.extend_from_slice(b"NEXT REQUEST");
        let mut stream = Trickle::new(&data, 4);

        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(raw.bytes, POST);
    }

    #[tokio::test]
    async fn test_extra_buffered_bytes_dropped() {
        let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nabcdef";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert!(raw.bytes.ends_with(b"\r\n\r\nab"));
    }

    #[tokio::test]
    async fn test_duplicate_content_length_reads_last_value() {
        let mut stream: &[u8] =
            b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 10\r\n\r\n0123456789";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(raw.framing, Framing::Complete);
        assert!(raw.bytes.ends_with(b"0123456789"));
    }

    #[tokio::test]
    async fn test_eof_before_terminator() {
        let mut stream: &[u8] = b"GET /half HTTP/1.1\r\nHost";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(raw.framing, Framing::Unterminated);
        assert_eq!(raw.bytes, b"GET /half HTTP/1.1\r\nHost");
        assert_eq!(raw.request_line(), "GET /half HTTP/1.1");
    }

    #[tokio::test]
    async fn test_eof_mid_body() {
        let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(
            raw.framing,
            Framing::ShortBody {
                expected: 10,
                received: 3
            }
        );
    }

    #[tokio::test]
    async fn test_empty_connection() {
        let mut stream: &[u8] = b"";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.framing, Framing::Unterminated);
    }

    #[tokio::test]
    async fn test_unparseable_content_length_treated_as_zero() {
        let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
        assert_eq!(raw.framing, Framing::Complete);
    }

    #[tokio::test]
    async fn test_header_limit() {
        let limits = RequestLimits {
            max_header_bytes: 32,
            max_body_bytes: 1024,
        };
        let mut data = b"GET / HTTP/1.1\r\n".to_vec();
        data.extend(std::iter::repeat(b'a').take(64));
        let mut stream = Trickle::new(&data, 8);

        let err = read_request(&mut stream, limits).await.unwrap_err();
        assert!(matches!(err, ReadError::HeadersTooLarge { limit: 32 }));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let limits = RequestLimits {
            max_header_bytes: 1024,
            max_body_bytes: 4,
        };
        let mut stream: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";

        let err = read_request(&mut stream, limits).await.unwrap_err();
        assert!(matches!(
            err,
            ReadError::BodyTooLarge {
                declared: 5,
                limit: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_terminator_split_across_reads() {
        let data = b"GET /split HTTP/1.1\r\nHost: h\r\n\r\n";
        // Every split point of the terminator is exercised with step 1 and 3.
        for step in [1, 3] {
            let mut stream = Trickle::new(data, step);
            let raw = read_request(&mut stream, RequestLimits::default()).await.unwrap();
            assert_eq!(raw.framing, Framing::Complete);
            assert_eq!(raw.header_len, Some(data.len()));
        }
    }
}
