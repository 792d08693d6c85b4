//! Allow-list loading errors

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while loading an allow-list
///
/// Both are configuration errors: the server refuses to start.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The allow-list file could not be read
    #[error("failed to read allow-list file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An entry is not a usable identifier
    #[error("invalid identifier '{value}' at line {line}: {reason}")]
    InvalidId {
        /// 1-based line number, or position in an inline list
        line: usize,
        value: String,
        reason: String,
    },
}

impl AuthError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_id(line: usize, value: &str, source: uuid::Error) -> Self {
        Self::InvalidId {
            line,
            value: value.to_string(),
            reason: source.to_string(),
        }
    }

    /// The nil UUID marks an empty buffer slot and cannot be allowed
    pub fn nil_id(line: usize) -> Self {
        Self::InvalidId {
            line,
            value: uuid::Uuid::nil().to_string(),
            reason: "nil identifier is reserved".to_string(),
        }
    }
}
