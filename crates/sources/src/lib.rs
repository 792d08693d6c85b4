//! Strand - Sources
//!
//! Network sources that feed the ingestion buffer.
//!
//! # Available Sources
//!
//! - **UDP** - One encoded event per datagram, fire-and-forget
//!
//! # Design Principles
//!
//! - **Single producer**: the UDP source is the only writer to the
//!   ingestion buffer
//! - **Tag once**: interest masks are computed at ingestion, so consumers
//!   never re-evaluate viewer filters
//! - **Never block on consumers**: appending overwrites the oldest slot and
//!   only nudges consumers through their flush triggers
//!
//! # Example
//!
//! ```ignore
//! use strand_sources::udp::{UdpIngestConfig, UdpIngestSource};
//!
//! let source = UdpIngestSource::bind(
//!     UdpIngestConfig::default(),
//!     allowed,
//!     buffer,
//!     registry,
//!     vec![rotator_trigger, fanout_trigger],
//! )?;
//! tokio::spawn(source.run(cancel.child_token()));
//! ```

pub mod udp;

pub use udp::{
    UdpIngestConfig, UdpIngestError, UdpIngestMetrics, UdpIngestMetricsSnapshot, UdpIngestSource,
};
