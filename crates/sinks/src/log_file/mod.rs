//! Log File Sink - Rotating framed event files
//!
//! `LogFileRotator` is the durable consumer of the ingestion buffer. Each
//! cycle it writes the entries appended since its previous cycle to the open
//! file, one frame per event, and moves to the next file once the current one
//! holds `max_entries_per_file` frames. File indexes wrap at `max_files`, so
//! the oldest file is overwritten rather than the directory growing.
//!
//! # Example
//!
//! ```ignore
//! let rotator = LogFileRotator::open(config, buffer, trigger)?;
//! tokio::spawn(rotator.run(cancel.child_token()));
//! ```
//!
//! # Directory Layout
//!
//! ```text
//! {path}/events_00000.log
//! {path}/events_00001.log
//! ...
//! {path}/events_{max_files - 1}.log
//! ```
//!
//! # Resume
//!
//! On open, the most recently modified file is located. If it holds fewer
//! than `max_entries_per_file` frames it is appended to; if it is full, or
//! cannot be read cleanly, writing starts fresh at the next index.

mod frame;

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use tokio_util::sync::CancellationToken;

use strand_pipeline::{ConsumerCursor, FlushTrigger, IngestionBuffer};
use strand_protocol::{LogMessage, encode_message_into};

use crate::error::{LogFileError, Result};

pub use frame::{
    DELIMITER, FRAME_OVERHEAD, LogFileReader, MessageIterator, count_frames, read_log_messages,
    write_frame,
};

/// File name prefix
const FILE_PREFIX: &str = "events_";

/// File name extension
const FILE_EXTENSION: &str = ".log";

/// Name of the file at `index`
pub fn file_name(index: usize) -> String {
    format!("{FILE_PREFIX}{index:05}{FILE_EXTENSION}")
}

/// Parse the index out of a log file name
pub fn parse_file_name(name: &str) -> Option<usize> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .parse()
        .ok()
}

/// Every log file in `dir`, sorted by index
pub fn list_log_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| LogFileError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LogFileError::io(dir, e))?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_file_name) {
            files.push((index, entry.path()));
        }
    }

    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

/// Configuration for the log file rotator
#[derive(Debug, Clone)]
pub struct LogFileConfig {
    /// Directory holding the log files
    pub path: PathBuf,

    /// Number of file indexes before wrapping
    pub max_files: usize,

    /// Frames per file before rotating
    pub max_entries_per_file: u64,

    /// Longest wait between cycles without a trigger
    pub flush_interval: Duration,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("strand"),
            max_files: 10,
            max_entries_per_file: 100_000,
            flush_interval: Duration::from_secs(30),
        }
    }
}

impl LogFileConfig {
    /// Create config with custom path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

/// Metrics for the log file rotator
#[derive(Debug, Default)]
pub struct RotatorMetrics {
    pub cycles: AtomicU64,
    pub entries_written: AtomicU64,
    pub bytes_written: AtomicU64,
    pub rotations: AtomicU64,
    pub write_errors: AtomicU64,
    pub entries_lost: AtomicU64,
}

impl RotatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self, bytes: u64) {
        self.entries_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RotatorMetricsSnapshot {
        RotatorMetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            entries_written: self.entries_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            entries_lost: self.entries_lost.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of rotator metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotatorMetricsSnapshot {
    pub cycles: u64,
    pub entries_written: u64,
    pub bytes_written: u64,
    pub rotations: u64,
    pub write_errors: u64,
    pub entries_lost: u64,
}

/// Periodic consumer that persists the ingestion buffer to rotating files
///
/// Owns the open file handle; nothing else touches it.
pub struct LogFileRotator {
    config: LogFileConfig,
    buffer: Arc<IngestionBuffer>,
    trigger: Arc<FlushTrigger>,
    cursor: ConsumerCursor,

    /// Index of the current file
    file_index: usize,
    /// Frames in the current file
    entries_in_file: u64,
    /// Open lazily on the first write after a rotation
    writer: Option<BufWriter<File>>,
    /// Open the current file in append mode rather than truncating
    append: bool,

    /// Reused encoding buffer
    scratch: BytesMut,
    metrics: Arc<RotatorMetrics>,
}

impl LogFileRotator {
    /// Create the directory if needed and locate the file to resume
    pub fn open(
        config: LogFileConfig,
        buffer: Arc<IngestionBuffer>,
        trigger: Arc<FlushTrigger>,
    ) -> Result<Self> {
        let config = LogFileConfig {
            max_files: config.max_files.max(1),
            max_entries_per_file: config.max_entries_per_file.max(1),
            ..config
        };
        fs::create_dir_all(&config.path).map_err(|e| LogFileError::io(&config.path, e))?;

        let (file_index, entries_in_file, append) = resume_point(&config)?;
        tracing::info!(
            path = %config.path.display(),
            file = %file_name(file_index),
            entries = entries_in_file,
            append,
            "log file rotator opened"
        );

        Ok(Self {
            cursor: ConsumerCursor::new(buffer.capacity()),
            config,
            buffer,
            trigger,
            file_index,
            entries_in_file,
            writer: None,
            append,
            scratch: BytesMut::with_capacity(4096),
            metrics: Arc::new(RotatorMetrics::new()),
        })
    }

    /// Shared metrics, valid after `run` consumes the rotator
    pub fn metrics_handle(&self) -> Arc<RotatorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Path of the current file
    pub fn current_path(&self) -> PathBuf {
        self.config.path.join(file_name(self.file_index))
    }

    /// Write every entry appended since the previous cycle
    ///
    /// Returns the number of events written. Write failures are logged and
    /// counted; the failing file is abandoned and the cycle continues with
    /// the next one.
    pub fn run_cycle(&mut self) -> u64 {
        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.buffer.snapshot();
        let pending = self.cursor.next_window(&snapshot);

        if pending.lost > 0 {
            tracing::warn!(lost = pending.lost, "log file rotator fell behind, entries overwritten");
            self.metrics
                .entries_lost
                .fetch_add(pending.lost, Ordering::Relaxed);
        }

        if !pending.has_data {
            self.cursor.commit(pending.position);
            self.trigger.record(pending.position);
            return 0;
        }

        let mut written = 0;
        for index in pending.window.indices() {
            let Some(msg) = snapshot.get(index) else {
                continue;
            };
            match self.write_entry(msg) {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::error!(file = %self.current_path().display(), error = %e, "failed to write event");
                    self.metrics.record_error();
                    if !matches!(e, LogFileError::Encode(_)) {
                        self.rotate();
                    }
                }
            }
        }

        if let Err(e) = self.flush() {
            tracing::error!(error = %e, "failed to flush log file");
            self.metrics.record_error();
            self.rotate();
        }

        tracing::debug!(
            entries = pending.window.len(),
            written,
            file = %file_name(self.file_index),
            "log file cycle"
        );

        self.cursor.commit(pending.position);
        self.trigger.record(pending.position);
        written
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<()> {
        let result = self.flush();
        self.writer = None;
        self.append = true;
        result
    }

    /// Run cycles on the flush interval or trigger until cancelled
    ///
    /// A final cycle runs after cancellation so the buffer's tail reaches
    /// disk. Returns the final metrics snapshot.
    pub async fn run(mut self, cancel: CancellationToken) -> RotatorMetricsSnapshot {
        tracing::info!(
            path = %self.config.path.display(),
            interval = ?self.config.flush_interval,
            "log file rotator starting"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.trigger.notified() => {}
                _ = tokio::time::sleep(self.config.flush_interval) => {}
            }
            self.run_cycle();
        }

        self.run_cycle();
        if let Err(e) = self.close() {
            tracing::error!(error = %e, "failed to close log file");
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            cycles = snapshot.cycles,
            written = snapshot.entries_written,
            bytes = snapshot.bytes_written,
            rotations = snapshot.rotations,
            errors = snapshot.write_errors,
            lost = snapshot.entries_lost,
            "log file rotator shutting down"
        );
        snapshot
    }

    fn write_entry(&mut self, msg: &LogMessage) -> Result<()> {
        self.scratch.clear();
        encode_message_into(msg, &mut self.scratch)?;

        let path = self.current_path();
        let payload = std::mem::take(&mut self.scratch);
        let result = self
            .writer()
            .and_then(|writer| write_frame(writer, &payload).map_err(|e| LogFileError::io(&path, e)));
        self.scratch = payload;
        let bytes = result?;

        self.metrics.record_written(bytes as u64);
        self.entries_in_file += 1;
        if self.entries_in_file >= self.config.max_entries_per_file {
            self.rotate();
        }
        Ok(())
    }

    /// Current writer, opening the file if needed
    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let path = self.current_path();
                let mut options = OpenOptions::new();
                if self.append {
                    options.append(true).create(true);
                } else {
                    options.write(true).create(true).truncate(true);
                }
                let file = options.open(&path).map_err(|e| LogFileError::io(&path, e))?;
                self.append = true;
                BufWriter::with_capacity(64 * 1024, file)
            }
        };

        Ok(self.writer.insert(writer))
    }

    fn flush(&mut self) -> Result<()> {
        let path = self.current_path();
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(|e| LogFileError::io(&path, e)),
            None => Ok(()),
        }
    }

    /// Close the current file and move to the next index
    fn rotate(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(error = %e, "failed to flush log file before rotation");
            self.metrics.record_error();
        }

        let previous = self.file_index;
        self.writer = None;
        self.file_index = (self.file_index + 1) % self.config.max_files;
        self.entries_in_file = 0;
        self.append = false;
        self.metrics.rotations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            from = %file_name(previous),
            to = %file_name(self.file_index),
            "log file rotated"
        );
    }
}

/// `(index, frames already in the file, append)` to start writing at
fn resume_point(config: &LogFileConfig) -> Result<(usize, u64, bool)> {
    let mut newest: Option<SystemTime> = None;
    let mut tied: Vec<(usize, PathBuf)> = Vec::new();
    for (index, path) in list_log_files(&config.path)? {
        if index >= config.max_files {
            continue;
        }
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| LogFileError::io(&path, e))?;
        match newest {
            Some(t) if modified < t => {}
            Some(t) if modified == t => tied.push((index, path)),
            _ => {
                newest = Some(modified);
                tied = vec![(index, path)];
            }
        }
    }

    let Some((index, path)) = latest_of_tied(tied, config.max_files) else {
        return Ok((0, 0, false));
    };

    let next = (index + 1) % config.max_files;
    match count_frames(&path) {
        Ok(count) if count < config.max_entries_per_file => Ok((index, count, true)),
        Ok(_) => Ok((next, 0, false)),
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "cannot resume log file, starting the next one");
            Ok((next, 0, false))
        }
    }
}

/// Pick the most recently written file among those sharing one mtime
///
/// Rotation writes indices in order modulo `max_files`, so the last one
/// written is the one whose successor is not in the set. Falls back to the
/// highest index when every index is present.
fn latest_of_tied(mut tied: Vec<(usize, PathBuf)>, max_files: usize) -> Option<(usize, PathBuf)> {
    let indices: Vec<usize> = tied.iter().map(|(index, _)| *index).collect();
    let is_end = |index: usize| !indices.contains(&((index + 1) % max_files));

    match tied.iter().rposition(|(index, _)| is_end(*index)) {
        Some(pos) => Some(tied.swap_remove(pos)),
        None => tied.pop(),
    }
}

#[cfg(test)]
#[path = "log_file_test.rs"]
mod tests;
