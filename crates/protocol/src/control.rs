//! Control channel protocol
//!
//! Frames exchanged between the server and viewers over a persistent
//! connection.
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────┬──────────┬──────────────────────────────┐
//! │ 4 bytes      │ 1 byte   │ N bytes                      │
//! │ length (BE)  │ op tag   │ payload                      │
//! └──────────────┴──────────┴──────────────────────────────┘
//! ```
//!
//! The length covers the tag and the payload.
//!
//! # Operations
//!
//! - `Connect` (5): Viewer → Server, 16-byte viewer identity; first frame
//! - `Disconnect` (7): Viewer → Server, no payload
//! - `Ping` (100): Viewer → Server, keep-alive, no payload
//! - `SetFilter` (101): Viewer → Server, `u32 count` + FilterSpecs (0 = clear)
//! - `GetFilter` (102): Viewer → Server, no payload
//! - `CurrentFilter` (202): Server → Viewer, `u32 count` + FilterSpecs
//! - `LogMessages` (203): Server → Viewer, `u32 count` + (`u32 len` + event)*

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::Result;
use crate::codec::{decode_message, encode_message_into, encoded_len, get_uuid, need, put_uuid};
use crate::error::ProtocolError;
use crate::filter::FilterSpec;
use crate::message::LogMessage;

/// Default upper bound on a single control frame (16 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Operation tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpTag {
    Connect = 5,
    Disconnect = 7,
    Ping = 100,
    SetFilter = 101,
    GetFilter = 102,
    CurrentFilter = 202,
    LogMessages = 203,
}

impl OpTag {
    #[inline]
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            5 => Some(Self::Connect),
            7 => Some(Self::Disconnect),
            100 => Some(Self::Ping),
            101 => Some(Self::SetFilter),
            102 => Some(Self::GetFilter),
            202 => Some(Self::CurrentFilter),
            203 => Some(Self::LogMessages),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Messages exchanged on the control channel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Viewer → Server: identify the connection
    Connect { viewer_id: Uuid },
    /// Viewer → Server: close the session
    Disconnect,
    /// Viewer → Server: keep-alive
    Ping,
    /// Viewer → Server: replace the filter set (empty = clear)
    SetFilter(Vec<FilterSpec>),
    /// Viewer → Server: request the current filter set
    GetFilter,
    /// Server → Viewer: response to `GetFilter`
    CurrentFilter(Vec<FilterSpec>),
    /// Server → Viewer: a batch of matching events, oldest first
    LogMessages(Vec<Arc<LogMessage>>),
    /// Any tag outside the known set; the payload is discarded
    Unknown(u8),
}

impl ControlMessage {
    /// Operation tag for this message
    pub fn tag(&self) -> u8 {
        match self {
            Self::Connect { .. } => OpTag::Connect.as_u8(),
            Self::Disconnect => OpTag::Disconnect.as_u8(),
            Self::Ping => OpTag::Ping.as_u8(),
            Self::SetFilter(_) => OpTag::SetFilter.as_u8(),
            Self::GetFilter => OpTag::GetFilter.as_u8(),
            Self::CurrentFilter(_) => OpTag::CurrentFilter.as_u8(),
            Self::LogMessages(_) => OpTag::LogMessages.as_u8(),
            Self::Unknown(tag) => *tag,
        }
    }

    /// Encode with length prefix
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64);

        // Reserve space for length prefix (filled in at end)
        buf.put_u32(0);
        buf.put_u8(self.tag());

        match self {
            Self::Connect { viewer_id } => put_uuid(viewer_id, &mut buf),
            Self::SetFilter(specs) | Self::CurrentFilter(specs) => {
                buf.put_u32(specs.len() as u32);
                for spec in specs {
                    spec.encode(&mut buf);
                }
            }
            Self::LogMessages(messages) => encode_messages(messages, &mut buf)?,
            Self::Disconnect | Self::Ping | Self::GetFilter | Self::Unknown(_) => {}
        }

        let len = (buf.len() - LENGTH_PREFIX_SIZE) as u32;
        buf[0..LENGTH_PREFIX_SIZE].copy_from_slice(&len.to_be_bytes());

        Ok(buf.freeze())
    }

    /// Decode a frame body (the bytes after the length prefix)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }

        let tag = buf.get_u8();
        let Some(op) = OpTag::from_u8(tag) else {
            return Ok(Self::Unknown(tag));
        };

        let msg = match op {
            OpTag::Connect => Self::Connect {
                viewer_id: get_uuid(&mut buf, "viewer_id")?,
            },
            OpTag::Disconnect => Self::Disconnect,
            OpTag::Ping => Self::Ping,
            OpTag::GetFilter => Self::GetFilter,
            OpTag::SetFilter => Self::SetFilter(decode_specs(&mut buf)?),
            OpTag::CurrentFilter => Self::CurrentFilter(decode_specs(&mut buf)?),
            OpTag::LogMessages => Self::LogMessages(decode_messages(&mut buf)?),
        };

        if buf.has_remaining() {
            return Err(ProtocolError::TrailingBytes(buf.remaining()));
        }

        Ok(msg)
    }

    /// Encode `messages` as one or more `LogMessages` frames, each at most
    /// `max_frame_size` bytes long (excluding the length prefix)
    ///
    /// A single event always fits: events are bounded far below any sane
    /// frame limit.
    pub fn encode_log_batches(
        messages: &[Arc<LogMessage>],
        max_frame_size: usize,
    ) -> Result<Vec<Bytes>> {
        // tag + count
        const OVERHEAD: usize = 1 + 4;

        let mut frames = Vec::new();
        let mut start = 0;
        let mut size = OVERHEAD;

        for (i, msg) in messages.iter().enumerate() {
            let item = 4 + encoded_len(msg);
            if i > start && size + item > max_frame_size {
                frames.push(Self::LogMessages(messages[start..i].to_vec()).encode()?);
                start = i;
                size = OVERHEAD;
            }
            size += item;
        }

        if start < messages.len() {
            frames.push(Self::LogMessages(messages[start..].to_vec()).encode()?);
        }

        Ok(frames)
    }
}

fn encode_messages(messages: &[Arc<LogMessage>], buf: &mut BytesMut) -> Result<()> {
    buf.put_u32(messages.len() as u32);
    for msg in messages {
        buf.put_u32(encoded_len(msg) as u32);
        encode_message_into(msg, buf)?;
    }
    Ok(())
}

fn decode_messages(buf: &mut Bytes) -> Result<Vec<Arc<LogMessage>>> {
    need(buf, 4, "message count")?;
    let count = buf.get_u32() as usize;
    let mut messages = Vec::with_capacity(count.min(buf.remaining() / 4));
    for _ in 0..count {
        need(buf, 4, "message length")?;
        let len = buf.get_u32() as usize;
        need(buf, len, "message")?;
        messages.push(Arc::new(decode_message(buf.split_to(len))?));
    }
    Ok(messages)
}

fn decode_specs(buf: &mut Bytes) -> Result<Vec<FilterSpec>> {
    need(buf, 4, "filter count")?;
    let count = buf.get_u32() as usize;
    let mut specs = Vec::with_capacity(count.min(buf.remaining()));
    for _ in 0..count {
        specs.push(FilterSpec::decode(buf)?);
    }
    Ok(specs)
}

/// Read a 4-byte big-endian length prefix
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[cfg(test)]
#[path = "control_test.rs"]
mod tests;
