//! Strand Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use strand_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[listener]\nport = 9000").unwrap();
//! assert_eq!(config.listener.port, 9000);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [global]
//! buffer_capacity = 1000000
//!
//! [listener]
//! port = 7771
//! allowed_apps_file = "configs/apps.conf"
//!
//! [viewers]
//! port = 7772
//! max_viewers = 32
//! allowed_viewers_file = "configs/viewers.conf"
//!
//! [log_files]
//! path = "/var/lib/strand"
//! ```

mod error;
mod global;
mod listener;
mod log_files;
mod logging;
mod validation;
mod viewers;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use global::{DEFAULT_BUFFER_CAPACITY, GlobalConfig};
pub use listener::{DEFAULT_LISTENER_PORT, ListenerConfig};
pub use log_files::LogFilesConfig;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use viewers::{DEFAULT_VIEWERS_PORT, MAX_VIEWER_SLOTS, ViewersConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global settings (buffer capacity, shutdown)
    pub global: GlobalConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// UDP ingestion endpoint and application allow-list
    pub listener: ListenerConfig,

    /// Viewer control channel, allow-list and fan-out pacing
    pub viewers: ViewersConfig,

    /// Rotating on-disk log files
    pub log_files: LogFilesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
