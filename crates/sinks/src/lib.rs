//! Strand - Sinks
//!
//! Durable output for the ingestion buffer.
//!
//! # Architecture
//!
//! The log file rotator is a periodic consumer: it keeps its own cursor into
//! the ingestion buffer and, on every timer tick or flush trigger, writes the
//! entries appended since its last cycle.
//!
//! ```text
//! [IngestionBuffer] --snapshot--> [LogFileRotator] --frames--> events_NNNNN.log
//! ```
//!
//! # File Format
//!
//! ```text
//! [4-byte length (LE)][event bytes][FF FF FF FF]
//! ```

mod error;

/// Rotating framed log files and their reader
pub mod log_file;

pub use error::{LogFileError, Result};
pub use log_file::{
    LogFileConfig, LogFileReader, LogFileRotator, RotatorMetrics, RotatorMetricsSnapshot,
    count_frames, file_name, list_log_files, read_log_messages, write_frame,
};
