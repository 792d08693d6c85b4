//! Strand Protocol - Event and control-channel wire formats
//!
//! This crate provides the types that flow through the server:
//! - `LogMessage` - One telemetry event, as sent by a client in one datagram
//! - `FilterSpec` - A viewer's predicate over events
//! - `ControlMessage` - Frames exchanged with viewers over the control channel
//!
//! # Wire Formats
//!
//! Events use a compact, versioned, big-endian binary layout (see [`codec`]).
//! The same bytes are the payload of on-disk log frames and of the
//! `LogMessages` control frame, so an event is encoded exactly once per sink.
//!
//! Control frames are length-prefixed:
//! ```text
//! [4-byte length (BE)][1-byte operation tag][payload]
//! ```

pub mod codec;
pub mod control;
mod error;
mod filter;
mod message;

pub use codec::{decode_message, encode_message, encode_message_into};
pub use control::{ControlMessage, DEFAULT_MAX_FRAME_SIZE, OpTag, read_length_prefix};
pub use error::ProtocolError;
pub use filter::{DomainMask, FilterSpec, FilterState};
pub use message::{Command, LogMessage, MAX_BODY_LEN, MAX_HEADER_LEN};

// Re-export for convenience
pub use bytes::{Bytes, BytesMut};
pub use uuid::Uuid;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
