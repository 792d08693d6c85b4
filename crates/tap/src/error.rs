//! Error types for the tap crate

use std::io;

use thiserror::Error;

use strand_protocol::{ProtocolError, Uuid};

/// Errors that can occur in the viewer side of the server
#[derive(Error, Debug)]
pub enum TapError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed control frame
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// More allow-listed viewers than the registry can hold
    #[error("{count} allow-listed viewers exceed the capacity of {max}")]
    TooManyViewers { count: usize, max: usize },

    /// Viewer identity not on the allow-list
    #[error("viewer not registered: {id}")]
    UnknownViewer { id: Uuid },

    /// Viewer has no live connection
    #[error("viewer not connected: {id}")]
    NotConnected { id: Uuid },

    /// Viewer's outbound queue is full
    #[error("outbound queue full for viewer {id}")]
    QueueFull { id: Uuid },

    /// Channel closed (viewer disconnected)
    #[error("channel closed")]
    ChannelClosed,

    /// Connection violated the handshake
    #[error("handshake failed: {0}")]
    Handshake(String),
}

impl TapError {
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
