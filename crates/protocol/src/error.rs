//! Protocol error types
//!
//! Errors that can occur when encoding or decoding events and control frames.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input ended before a field could be read
    #[error("truncated {field}: need {needed} bytes, have {remaining}")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Event encoded with a version this build does not understand
    #[error("unsupported event version: {0}")]
    UnsupportedVersion(u8),

    /// Command code outside the known set
    #[error("unknown command code: {0}")]
    UnknownCommand(u8),

    /// Filter state code outside the known set
    #[error("unknown filter state: {0}")]
    UnknownFilterState(u8),

    /// Header or body exceeds its bound
    #[error("{field} is {len} bytes, limit is {max}")]
    PayloadTooLarge {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Bytes left over after a complete event
    #[error("{0} trailing bytes after event")]
    TrailingBytes(usize),

    /// Timestamp outside the representable range
    #[error("timestamp out of range: {0}us")]
    InvalidTimestamp(i64),

    /// Control frame without an operation tag
    #[error("empty control frame")]
    EmptyFrame,

    /// Control frame larger than the configured maximum
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },
}

impl ProtocolError {
    /// Create a truncation error for `field`
    #[inline]
    pub fn truncated(field: &'static str, needed: usize, remaining: usize) -> Self {
        Self::Truncated {
            field,
            needed,
            remaining,
        }
    }

    /// Create a payload-too-large error
    #[inline]
    pub fn too_large(field: &'static str, len: usize, max: usize) -> Self {
        Self::PayloadTooLarge { field, len, max }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
