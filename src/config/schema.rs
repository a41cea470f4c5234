//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the listener.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the capture listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Served root and capture output directories.
    pub directories: DirectoryConfig,

    /// Route table settings.
    pub routes: RoutesConfig,

    /// Request capture settings.
    pub capture: CaptureConfig,

    /// Local debugging features.
    pub debug: DebugConfig,

    /// Per-connection deadlines.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 64,
        }
    }
}

/// Directories the listener reads from and writes to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Root of the static file tree served to GET requests.
    pub www_dir: PathBuf,

    /// Where captured requests and attachments are written.
    pub out_dir: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            www_dir: PathBuf::from("./www"),
            out_dir: PathBuf::from("./out"),
        }
    }
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path prefix handled by the arithmetic handler when a query string is present.
    /// An empty string disables the dynamic route.
    pub dynamic_prefix: Option<String>,

    /// Answer unrecognized methods with `200 OK` instead of `405 Method Not Allowed`.
    pub permissive_fallback: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            dynamic_prefix: Some("/calc".to_string()),
            permissive_fallback: true,
        }
    }
}

/// Capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Record every GET request as a text file in the output directory.
    pub record_get_requests: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            record_get_requests: true,
        }
    }
}

/// Features meant for local debugging only.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Render an HTML listing for directory requests.
    /// WARNING: exposes the served tree layout. Never enable outside local development.
    pub directory_listing: bool,
}

/// Timeout configuration for connection I/O.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for reading a complete request, in seconds.
    pub read_secs: u64,

    /// Deadline for writing the response, in seconds.
    pub write_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 30,
            write_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of the request line plus header block in bytes.
    pub max_header_bytes: usize,

    /// Maximum accepted Content-Length in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
