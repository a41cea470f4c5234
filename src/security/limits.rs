//! Request size limits.
//!
//! # Responsibilities
//! - Enforce maximum header block size while headers are still being read
//! - Enforce maximum declared body size before the body is read
//!
//! # Design Decisions
//! - Limits checked before full parsing (early rejection)
//! - Oversized headers map to 431, oversized bodies to 413

use crate::config::LimitsConfig;

/// Size limits applied by the request reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl RequestLimits {
    /// Returns true if a header block of `len` bytes is still acceptable.
    pub fn header_fits(&self, len: usize) -> bool {
        len <= self.max_header_bytes
    }

    /// Returns true if a declared body of `len` bytes is acceptable.
    pub fn body_fits(&self, len: usize) -> bool {
        len <= self.max_body_bytes
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for RequestLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
        }
    }
}
