//! Strand Tap - Live viewer side of the server
//!
//! This crate provides everything between the ingestion buffer and the
//! viewers:
//!
//! - Evaluates viewer filters against events during ingestion
//! - Keeps the viewer table in copy-on-write generations so ingestion never
//!   waits on a filter update
//! - Delivers tagged events to each viewer over its control connection
//! - Clears a viewer's filters when its connection closes
//!
//! # Architecture
//!
//! ```text
//! Ingest ──→ interest_mask(table, event) ──→ IngestionBuffer
//!               ▲                                  │
//!               │ snapshot                         ▼
//!         ViewerRegistry ◄── SetFilter ──┐    ViewerFanout
//!                                        │         │ per-viewer batches
//!                                  ControlServer   ▼
//!                                        │   ConnectionManager
//!                                        │         │
//!                                        └──→ Viewers (TCP) ◄──┘
//! ```

mod connection;
mod error;
pub mod fanout;
pub mod filter;
pub mod registry;
pub mod server;

pub use connection::{ConnectionId, ConnectionManager};
pub use error::{Result, TapError};
pub use fanout::{FanoutConfig, FanoutMetrics, FanoutMetricsSnapshot, ViewerFanout};
pub use filter::{interest_mask, matches, matches_constraints};
pub use registry::{MAX_VIEWERS, ViewerEntry, ViewerRegistry, ViewerTable};
pub use server::{ControlServer, ControlServerConfig, read_frame, write_frame};
