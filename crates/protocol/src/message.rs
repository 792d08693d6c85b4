//! The telemetry event
//!
//! A `LogMessage` is built by a client, sent in a single datagram, and
//! completed by the server on receipt: the server stamps `server_timestamp`
//! and computes `interest_mask` before the event is appended to the ring
//! buffer. After that the event is shared as `Arc<LogMessage>` and never
//! mutated again.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Maximum header payload size in bytes
pub const MAX_HEADER_LEN: usize = 128;

/// Maximum body payload size in bytes
pub const MAX_BODY_LEN: usize = 1024;

/// Execution marker carried by an event
///
/// `Start` and `Stop` bracket a timed execution; the client computes
/// `execution_time` on the `Stop` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// No command set by the client
    #[default]
    None = 0,
    /// Plain log line
    Normal = 1,
    /// Start of a timed execution
    Start = 2,
    /// End of a timed execution
    Stop = 3,
}

impl Command {
    /// Decode a wire code
    #[inline]
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Normal),
            2 => Some(Self::Start),
            3 => Some(Self::Stop),
            _ => None,
        }
    }

    /// Wire code
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "normal",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "normal" => Ok(Self::Normal),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// One telemetry event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessage {
    /// Emitting application; the nil UUID marks an empty slot
    pub application_key: Uuid,

    /// Source domain, matched with network-style prefix masks
    pub domain: u32,

    /// Client-assigned severity
    pub level: i32,

    /// Client-defined tag
    pub client_tag: i64,

    /// Groups related events
    pub transaction_id: Uuid,

    /// Distinguishes repeated executions within a transaction
    pub execution_id: Option<Uuid>,

    /// Execution marker
    pub command: Command,

    /// Client-side creation time
    pub origin_timestamp: Option<DateTime<Utc>>,

    /// Duration of the execution, set on `Stop`
    pub execution_time: Option<Duration>,

    /// Server receipt time, set once on ingestion
    pub server_timestamp: Option<DateTime<Utc>>,

    /// Client-defined header payload (at most `MAX_HEADER_LEN` bytes)
    pub header: Bytes,

    /// Client-defined body payload (at most `MAX_BODY_LEN` bytes)
    pub body: Bytes,

    /// One bit per viewer whose filter matched, computed by the server
    pub interest_mask: u64,
}

impl LogMessage {
    /// Create an event for `application_key` with every other field empty
    pub fn new(application_key: Uuid) -> Self {
        Self {
            application_key,
            ..Default::default()
        }
    }

    /// True for the startup placeholder (nil application key)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.application_key.is_nil()
    }

    pub fn with_domain(mut self, domain: u32) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_client_tag(mut self, tag: i64) -> Self {
        self.client_tag = tag;
        self
    }

    pub fn with_transaction_id(mut self, id: Uuid) -> Self {
        self.transaction_id = id;
        self
    }

    pub fn with_execution_id(mut self, id: Uuid) -> Self {
        self.execution_id = Some(id);
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn with_origin_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.origin_timestamp = Some(ts);
        self
    }

    pub fn with_execution_time(mut self, elapsed: Duration) -> Self {
        self.execution_time = Some(elapsed);
        self
    }

    pub fn with_server_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.server_timestamp = Some(ts);
        self
    }

    pub fn with_header(mut self, header: impl Into<Bytes>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Format as a single human-readable line
    pub fn display_line(&self) -> String {
        let ts = |t: Option<DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
                .unwrap_or_else(|| "-".into())
        };
        let domain = self.domain.to_be_bytes();

        format!(
            "{} {} | {}.{}.{}.{} | level={} tag={} | tx={} exec={} | cmd={} mask={:#x} | origin={} elapsed={} | {} | {}",
            ts(self.server_timestamp),
            self.application_key,
            domain[0],
            domain[1],
            domain[2],
            domain[3],
            self.level,
            self.client_tag,
            self.transaction_id,
            self.execution_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".into()),
            self.command,
            self.interest_mask,
            ts(self.origin_timestamp),
            self.execution_time
                .map(|d| format!("{}us", d.as_micros()))
                .unwrap_or_else(|| "-".into()),
            String::from_utf8_lossy(&self.header),
            String::from_utf8_lossy(&self.body),
        )
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
