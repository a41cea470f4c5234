//! Command-line arguments.
//!
//! Flags override the matching config file fields; the result is validated
//! again after overrides are applied.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ServerConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "capture-listener")]
#[command(about = "Local HTTP listener that serves static files and captures requests", long_about = None)]
pub struct CliArgs {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on, keeping the configured bind host.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory static files are served from.
    #[arg(long)]
    pub www_dir: Option<PathBuf>,

    /// Directory captured requests are written to.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Path prefix of the arithmetic handler. Empty disables it.
    #[arg(long)]
    pub dynamic_prefix: Option<String>,

    /// Serve HTML directory listings (local debugging only).
    #[arg(long)]
    pub directory_listing: bool,
}

impl CliArgs {
    /// Load the config file (or defaults) and apply overrides.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
        if let Some(dir) = &self.www_dir {
            config.directories.www_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.directories.out_dir = dir.clone();
        }
        if let Some(prefix) = &self.dynamic_prefix {
            config.routes.dynamic_prefix = Some(prefix.clone());
        }
        if self.directory_listing {
            config.debug.directory_listing = true;
        }
    }
}
