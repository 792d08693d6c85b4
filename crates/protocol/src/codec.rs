//! Event datagram codec
//!
//! # Wire Format
//!
//! All integers are big-endian. Optional fields are present only when the
//! matching bit is set in the presence flags.
//!
//! ```text
//! u8        version (= 1)
//! [16]      application_key
//! u32       domain
//! i32       level
//! i64       client_tag
//! [16]      transaction_id
//! u8        command
//! u8        presence flags
//! [16]      execution_id            (flag 0x01)
//! i64       origin timestamp, us    (flag 0x02)
//! u64       execution time, us      (flag 0x04)
//! i64       server timestamp, us    (flag 0x08)
//! u64       interest_mask
//! u16 + N   header
//! u16 + N   body
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::message::{Command, LogMessage, MAX_BODY_LEN, MAX_HEADER_LEN};
use crate::Result;

/// Current event layout version
pub const EVENT_VERSION: u8 = 1;

/// Size of an event with no optional fields and empty payloads
pub const MIN_EVENT_SIZE: usize = 1 + 16 + 4 + 4 + 8 + 16 + 1 + 1 + 8 + 2 + 2;

/// Size of an event with every optional field and full payloads
pub const MAX_EVENT_SIZE: usize = MIN_EVENT_SIZE + 16 + 8 + 8 + 8 + MAX_HEADER_LEN + MAX_BODY_LEN;

const FLAG_EXECUTION_ID: u8 = 0x01;
const FLAG_ORIGIN_TS: u8 = 0x02;
const FLAG_EXECUTION_TIME: u8 = 0x04;
const FLAG_SERVER_TS: u8 = 0x08;

/// Encode an event into a fresh buffer
pub fn encode_message(msg: &LogMessage) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(msg));
    encode_message_into(msg, &mut buf)?;
    Ok(buf.freeze())
}

/// Append an encoded event to `buf`
///
/// Fails without writing anything if the header or body exceeds its bound.
pub fn encode_message_into(msg: &LogMessage, buf: &mut BytesMut) -> Result<()> {
    if msg.header.len() > MAX_HEADER_LEN {
        return Err(ProtocolError::too_large("header", msg.header.len(), MAX_HEADER_LEN));
    }
    if msg.body.len() > MAX_BODY_LEN {
        return Err(ProtocolError::too_large("body", msg.body.len(), MAX_BODY_LEN));
    }

    buf.reserve(encoded_len(msg));
    buf.put_u8(EVENT_VERSION);
    put_uuid(&msg.application_key, buf);
    buf.put_u32(msg.domain);
    buf.put_i32(msg.level);
    buf.put_i64(msg.client_tag);
    put_uuid(&msg.transaction_id, buf);
    buf.put_u8(msg.command.as_u8());

    let mut flags = 0u8;
    if msg.execution_id.is_some() {
        flags |= FLAG_EXECUTION_ID;
    }
    if msg.origin_timestamp.is_some() {
        flags |= FLAG_ORIGIN_TS;
    }
    if msg.execution_time.is_some() {
        flags |= FLAG_EXECUTION_TIME;
    }
    if msg.server_timestamp.is_some() {
        flags |= FLAG_SERVER_TS;
    }
    buf.put_u8(flags);

    if let Some(ref id) = msg.execution_id {
        put_uuid(id, buf);
    }
    if let Some(ts) = msg.origin_timestamp {
        buf.put_i64(ts.timestamp_micros());
    }
    if let Some(elapsed) = msg.execution_time {
        buf.put_u64(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
    }
    if let Some(ts) = msg.server_timestamp {
        buf.put_i64(ts.timestamp_micros());
    }

    buf.put_u64(msg.interest_mask);
    buf.put_u16(msg.header.len() as u16);
    buf.put_slice(&msg.header);
    buf.put_u16(msg.body.len() as u16);
    buf.put_slice(&msg.body);

    Ok(())
}

/// Decode exactly one event from `buf`
///
/// Header and body are sliced out of `buf` without copying.
pub fn decode_message(mut buf: Bytes) -> Result<LogMessage> {
    need(&buf, 1, "version")?;
    let version = buf.get_u8();
    if version != EVENT_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let application_key = get_uuid(&mut buf, "application_key")?;

    need(&buf, 16, "event fields")?;
    let domain = buf.get_u32();
    let level = buf.get_i32();
    let client_tag = buf.get_i64();

    let transaction_id = get_uuid(&mut buf, "transaction_id")?;

    need(&buf, 2, "command")?;
    let command_code = buf.get_u8();
    let command = Command::from_u8(command_code).ok_or(ProtocolError::UnknownCommand(command_code))?;
    let flags = buf.get_u8();

    let execution_id = if flags & FLAG_EXECUTION_ID != 0 {
        Some(get_uuid(&mut buf, "execution_id")?)
    } else {
        None
    };
    let origin_timestamp = if flags & FLAG_ORIGIN_TS != 0 {
        Some(get_timestamp(&mut buf, "origin_timestamp")?)
    } else {
        None
    };
    let execution_time = if flags & FLAG_EXECUTION_TIME != 0 {
        need(&buf, 8, "execution_time")?;
        Some(Duration::from_micros(buf.get_u64()))
    } else {
        None
    };
    let server_timestamp = if flags & FLAG_SERVER_TS != 0 {
        Some(get_timestamp(&mut buf, "server_timestamp")?)
    } else {
        None
    };

    need(&buf, 8, "interest_mask")?;
    let interest_mask = buf.get_u64();

    let header = get_payload(&mut buf, "header", MAX_HEADER_LEN)?;
    let body = get_payload(&mut buf, "body", MAX_BODY_LEN)?;

    if buf.has_remaining() {
        return Err(ProtocolError::TrailingBytes(buf.remaining()));
    }

    Ok(LogMessage {
        application_key,
        domain,
        level,
        client_tag,
        transaction_id,
        execution_id,
        command,
        origin_timestamp,
        execution_time,
        server_timestamp,
        header,
        body,
        interest_mask,
    })
}

/// Exact encoded size of `msg`
pub fn encoded_len(msg: &LogMessage) -> usize {
    let mut len = MIN_EVENT_SIZE + msg.header.len() + msg.body.len();
    if msg.execution_id.is_some() {
        len += 16;
    }
    if msg.origin_timestamp.is_some() {
        len += 8;
    }
    if msg.execution_time.is_some() {
        len += 8;
    }
    if msg.server_timestamp.is_some() {
        len += 8;
    }
    len
}

// ============================================================================
// Encoding helpers (shared with the control codec)
// ============================================================================

#[inline]
pub(crate) fn need(buf: &Bytes, n: usize, field: &'static str) -> Result<()> {
    if buf.remaining() < n {
        return Err(ProtocolError::truncated(field, n, buf.remaining()));
    }
    Ok(())
}

#[inline]
pub(crate) fn put_uuid(id: &Uuid, buf: &mut BytesMut) {
    buf.put_slice(id.as_bytes());
}

pub(crate) fn get_uuid(buf: &mut Bytes, field: &'static str) -> Result<Uuid> {
    need(buf, 16, field)?;
    let mut raw = [0u8; 16];
    buf.copy_to_slice(&mut raw);
    Ok(Uuid::from_bytes(raw))
}

pub(crate) fn get_timestamp(buf: &mut Bytes, field: &'static str) -> Result<DateTime<Utc>> {
    need(buf, 8, field)?;
    let micros = buf.get_i64();
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or(ProtocolError::InvalidTimestamp(micros))
}

fn get_payload(buf: &mut Bytes, field: &'static str, max: usize) -> Result<Bytes> {
    need(buf, 2, field)?;
    let len = buf.get_u16() as usize;
    if len > max {
        return Err(ProtocolError::too_large(field, len, max));
    }
    need(buf, len, field)?;
    Ok(buf.split_to(len))
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
