//! Strand - Pipeline
//!
//! The in-memory core shared by ingestion and both consumers.
//!
//! # Architecture
//!
//! ```text
//!                                ┌──→ ConsumerCursor ──→ LogFileRotator
//! [Ingest] ──→ IngestionBuffer ──┤
//!    │          (ring, N slots)  └──→ ConsumerCursor ──→ ViewerFanout
//!    │                                      ▲
//!    └──── FlushTrigger (per consumer) ─────┘
//! ```
//!
//! # Key Design
//!
//! - **Single producer**: `append` takes a short exclusive lock and never
//!   waits on a consumer
//! - **Snapshot consumers**: each consumer copies the slot array under a shared
//!   lock and scans the copy without further locking
//! - **Independent progress**: every consumer owns its own `ConsumerCursor`;
//!   consumers never share positions
//! - **Explicit wraparound**: positions carry a wrap counter, so a consumer
//!   that falls a full lap behind detects the loss instead of misreading it
//!   as "no new data"

mod buffer;
mod cursor;
mod trigger;
mod window;

pub use buffer::{BufferPosition, BufferSnapshot, IngestionBuffer};
pub use cursor::{ConsumerCursor, Pending};
pub use trigger::FlushTrigger;
pub use window::CatchUpWindow;
