//! Viewer filter specifications
//!
//! A `FilterSpec` is a conjunction of optional constraints. An absent field
//! imposes no constraint; a viewer's filter is replaced wholesale on every
//! update and never patched field by field. Evaluation lives with the viewer
//! registry; this module only defines the data and its wire encoding.

use std::collections::HashSet;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Result;
use crate::codec::{get_timestamp, get_uuid, need, put_uuid};
use crate::error::ProtocolError;
use crate::message::Command;

/// Whether a filter participates in live matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterState {
    /// Never matches
    #[default]
    Paused = 0,
    /// Matches live events
    On = 1,
    /// Reserved for historical file search; never matches live events
    Search = 2,
}

impl FilterState {
    /// Decode a wire code
    #[inline]
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Paused),
            1 => Some(Self::On),
            2 => Some(Self::Search),
            _ => None,
        }
    }

    /// Wire code
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Network-style prefix match over the 32-bit domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainMask {
    pub base: u32,
    pub mask: u32,
}

impl DomainMask {
    pub const fn new(base: u32, mask: u32) -> Self {
        Self { base, mask }
    }

    /// `(domain & mask) == (base & mask)`
    #[inline]
    pub const fn contains(&self, domain: u32) -> bool {
        (domain & self.mask) == (self.base & self.mask)
    }
}

/// A viewer's predicate over events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub state: FilterState,
    pub application_key: Option<Uuid>,
    pub domain: Option<DomainMask>,
    /// Matches events with `level <= max_level`
    pub max_level: Option<i32>,
    pub transaction_ids: Option<HashSet<Uuid>>,
    pub command: Option<Command>,
    /// Inclusive lower bound on the server timestamp
    pub begin_server_timestamp: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the server timestamp
    pub end_server_timestamp: Option<DateTime<Utc>>,
}

impl FilterSpec {
    /// Create a filter with no constraints in the given state
    pub fn new(state: FilterState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Create a live filter with no constraints
    pub fn on() -> Self {
        Self::new(FilterState::On)
    }

    pub fn with_application(mut self, key: Uuid) -> Self {
        self.application_key = Some(key);
        self
    }

    pub fn with_domain(mut self, base: u32, mask: u32) -> Self {
        self.domain = Some(DomainMask::new(base, mask));
        self
    }

    pub fn with_max_level(mut self, level: i32) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn with_transaction(mut self, id: Uuid) -> Self {
        self.transaction_ids.get_or_insert_with(HashSet::new).insert(id);
        self
    }

    pub fn with_transactions(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.transaction_ids
            .get_or_insert_with(HashSet::new)
            .extend(ids);
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_time_range(
        mut self,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.begin_server_timestamp = begin;
        self.end_server_timestamp = end;
        self
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.state.as_u8());

        match self.application_key {
            Some(ref key) => {
                buf.put_u8(1);
                put_uuid(key, buf);
            }
            None => buf.put_u8(0),
        }

        match self.domain {
            Some(domain) => {
                buf.put_u8(1);
                buf.put_u32(domain.base);
                buf.put_u32(domain.mask);
            }
            None => buf.put_u8(0),
        }

        match self.max_level {
            Some(level) => {
                buf.put_u8(1);
                buf.put_i32(level);
            }
            None => buf.put_u8(0),
        }

        match self.transaction_ids {
            Some(ref ids) => {
                buf.put_u8(1);
                buf.put_u32(ids.len() as u32);
                for id in ids {
                    put_uuid(id, buf);
                }
            }
            None => buf.put_u8(0),
        }

        match self.command {
            Some(command) => {
                buf.put_u8(1);
                buf.put_u8(command.as_u8());
            }
            None => buf.put_u8(0),
        }

        encode_option_timestamp(self.begin_server_timestamp, buf);
        encode_option_timestamp(self.end_server_timestamp, buf);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> Result<Self> {
        need(buf, 1, "filter state")?;
        let code = buf.get_u8();
        let state = FilterState::from_u8(code).ok_or(ProtocolError::UnknownFilterState(code))?;

        let application_key = if decode_flag(buf, "application_key")? {
            Some(get_uuid(buf, "application_key")?)
        } else {
            None
        };

        let domain = if decode_flag(buf, "domain")? {
            need(buf, 8, "domain")?;
            Some(DomainMask::new(buf.get_u32(), buf.get_u32()))
        } else {
            None
        };

        let max_level = if decode_flag(buf, "max_level")? {
            need(buf, 4, "max_level")?;
            Some(buf.get_i32())
        } else {
            None
        };

        let transaction_ids = if decode_flag(buf, "transaction_ids")? {
            need(buf, 4, "transaction_ids")?;
            let count = buf.get_u32() as usize;
            need(buf, count.saturating_mul(16), "transaction_ids")?;
            let mut ids = HashSet::with_capacity(count);
            for _ in 0..count {
                ids.insert(get_uuid(buf, "transaction_ids")?);
            }
            Some(ids)
        } else {
            None
        };

        let command = if decode_flag(buf, "command")? {
            need(buf, 1, "command")?;
            let code = buf.get_u8();
            Some(Command::from_u8(code).ok_or(ProtocolError::UnknownCommand(code))?)
        } else {
            None
        };

        let begin_server_timestamp = decode_option_timestamp(buf, "begin_server_timestamp")?;
        let end_server_timestamp = decode_option_timestamp(buf, "end_server_timestamp")?;

        Ok(Self {
            state,
            application_key,
            domain,
            max_level,
            transaction_ids,
            command,
            begin_server_timestamp,
            end_server_timestamp,
        })
    }
}

fn decode_flag(buf: &mut Bytes, field: &'static str) -> Result<bool> {
    need(buf, 1, field)?;
    Ok(buf.get_u8() != 0)
}

fn encode_option_timestamp(ts: Option<DateTime<Utc>>, buf: &mut BytesMut) {
    match ts {
        Some(ts) => {
            buf.put_u8(1);
            buf.put_i64(ts.timestamp_micros());
        }
        None => buf.put_u8(0),
    }
}

fn decode_option_timestamp(
    buf: &mut Bytes,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>> {
    if decode_flag(buf, field)? {
        Ok(Some(get_timestamp(buf, field)?))
    } else {
        Ok(None)
    }
}
