//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - invalid value
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        /// Config section (e.g., "viewers")
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Validation error - listener and control server share an endpoint
    #[error("listener and viewers are both configured on {address}:{port}")]
    PortConflict {
        /// Bind address
        address: String,
        /// The conflicting port
        port: u16,
    },
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }

    /// Create a PortConflict error
    pub fn port_conflict(address: impl Into<String>, port: u16) -> Self {
        Self::PortConflict {
            address: address.into(),
            port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid_value("viewers", "max_viewers", "must be at most 64");
        assert_eq!(
            err.to_string(),
            "[viewers] has invalid max_viewers: must be at most 64"
        );
    }

    #[test]
    fn test_port_conflict_display() {
        let err = ConfigError::port_conflict("0.0.0.0", 7771);
        assert!(err.to_string().contains("0.0.0.0:7771"));
    }
}
