//! Error types for log file sinks

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use strand_protocol::ProtocolError;

/// Errors from writing or reading framed log files
#[derive(Debug, Error)]
pub enum LogFileError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File content does not follow the frame format
    #[error("corrupt log file {path} at offset {offset}: {reason}")]
    Corrupt {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Event could not be encoded for writing
    #[error("failed to encode event: {0}")]
    Encode(#[from] ProtocolError),
}

impl LogFileError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: &Path, offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            offset,
            reason: reason.into(),
        }
    }

    /// True for frame-format violations
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result type for log file operations
pub type Result<T> = std::result::Result<T, LogFileError>;
