//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound request assembly with a read deadline
//! - Bound response delivery with a write deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A timed-out connection is closed without a response

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A deadline elapsed before the operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} deadline of {}s exceeded", .after.as_secs())]
pub struct TimeoutError {
    pub operation: &'static str,
    pub after: Duration,
}

/// Run `future` to completion or fail once `after` has elapsed.
pub async fn with_deadline<F, T>(
    operation: &'static str,
    after: Duration,
    future: F,
) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| TimeoutError { operation, after })
}
