//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → reader.rs (assemble one message: headers, then Content-Length body)
//!     → request.rs (request line, headers, query, body)
//!     → [routing picks a target, handlers produce a Response]
//!     → multipart.rs (attachment extraction for multipart captures)
//!     → response.rs (status line, headers, body)
//!     → Send to client, close
//! ```
//!
//! server.rs drives this per connection.

pub mod multipart;
pub mod reader;
pub mod request;
pub mod response;
pub mod server;

pub use multipart::{MultipartDecoder, MultipartError, MultipartForm, MultipartPart};
pub use reader::{read_request, Framing, RawRequest, ReadError, RequestReader};
pub use request::{Headers, QueryParams, Request, UNKNOWN_METHOD};
pub use response::Response;
pub use server::{ConnectionError, HttpServer};
