//! # Configuration Utilities
//!
//! TOML-backed configuration for the steganography service.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default request body limit (16 MiB upload cap).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: ServerConfig = load_config("config/server.toml")?;
/// ```
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
}

/// Settings for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP listener binds to (e.g. "127.0.0.1:3000")
    pub bind_addr: String,
    /// Directory of static frontend files served at "/"
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// TrueType font used for visible text watermarks.
    ///
    /// When unset, a handful of well-known system font locations are tried
    /// at startup. Text watermark requests fail if no font can be loaded.
    #[serde(default)]
    pub font_path: Option<String>,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_addr: "127.0.0.1:3000".to_string(),
                static_dir: default_static_dir(),
                font_path: None,
                max_upload_bytes: default_max_upload_bytes(),
            },
        }
    }
}
