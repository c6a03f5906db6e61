//! Server configuration
//!
//! Configuration is loaded from environment variables; command-line flags
//! may override individual values afterwards.

use std::env;
use std::path::PathBuf;

use crate::emblem::DEFAULT_ASSET_DIR;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the emblem asset
    pub assets_dir: PathBuf,
    /// Maximum request body size in bytes
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            assets_dir: PathBuf::from(DEFAULT_ASSET_DIR),
            max_upload_size: 20 * 1024 * 1024, // 20 MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(p) = lookup("PORT").and_then(|v| v.parse().ok()) {
            config.port = p;
        }
        if let Some(dir) = lookup("TRICOLOR_ASSETS_DIR").filter(|v| !v.is_empty()) {
            config.assets_dir = PathBuf::from(dir);
        }
        if let Some(mb) = lookup("TRICOLOR_MAX_UPLOAD_MB").and_then(|v| v.parse::<usize>().ok()) {
            config.max_upload_size = mb * 1024 * 1024;
        }

        config
    }

    /// Socket address string to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
