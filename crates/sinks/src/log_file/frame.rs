//! Frame format for log files
//!
//! ```text
//! [4-byte length (LE)][event bytes][FF FF FF FF]
//! ```
//!
//! The trailing delimiter lets a reader detect a misaligned length prefix
//! instead of silently reading garbage as the next event.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};

use strand_protocol::LogMessage;
use strand_protocol::codec::MAX_EVENT_SIZE;
use strand_protocol::decode_message;

use crate::error::{LogFileError, Result};

/// Frame trailer
pub const DELIMITER: [u8; 4] = [0xFF; 4];

/// Length prefix size
pub const LENGTH_SIZE: usize = 4;

/// Bytes a frame adds around its payload
pub const FRAME_OVERHEAD: usize = LENGTH_SIZE + DELIMITER.len();

/// Write one frame, returning the bytes written
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<usize> {
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&DELIMITER)?;
    Ok(payload.len() + FRAME_OVERHEAD)
}

/// Sequential reader over a framed log file
pub struct LogFileReader {
    reader: BufReader<File>,
    path: PathBuf,
    /// Offset of the next unread byte
    offset: u64,
}

impl LogFileReader {
    /// Open a log file for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LogFileError::io(path, e))?;

        Ok(Self {
            reader: BufReader::with_capacity(32 * 1024, file),
            path: path.to_path_buf(),
            offset: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next frame payload
    ///
    /// Returns `None` at a clean end of file. A partial frame, an oversized
    /// length or a wrong delimiter is a `Corrupt` error.
    pub fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let start = self.offset;

        let mut len_bytes = [0u8; LENGTH_SIZE];
        match self.fill(&mut len_bytes)? {
            0 => return Ok(None),
            LENGTH_SIZE => {}
            n => {
                return Err(LogFileError::corrupt(
                    &self.path,
                    start,
                    format!("truncated length prefix ({n} of {LENGTH_SIZE} bytes)"),
                ));
            }
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_EVENT_SIZE {
            return Err(LogFileError::corrupt(
                &self.path,
                start,
                format!("frame length {len} exceeds maximum {MAX_EVENT_SIZE}"),
            ));
        }

        let mut payload = BytesMut::zeroed(len);
        let n = self.fill(&mut payload)?;
        if n < len {
            return Err(LogFileError::corrupt(
                &self.path,
                start,
                format!("truncated payload ({n} of {len} bytes)"),
            ));
        }

        let mut delimiter = [0u8; 4];
        let n = self.fill(&mut delimiter)?;
        if n < delimiter.len() || delimiter != DELIMITER {
            return Err(LogFileError::corrupt(
                &self.path,
                start,
                format!("bad frame delimiter {:02x?}", &delimiter[..n]),
            ));
        }

        Ok(Some(payload.freeze()))
    }

    /// Read and decode the next event
    pub fn read_message(&mut self) -> Result<Option<LogMessage>> {
        let start = self.offset;
        let Some(payload) = self.read_frame()? else {
            return Ok(None);
        };

        decode_message(payload)
            .map(Some)
            .map_err(|e| LogFileError::corrupt(&self.path, start, format!("bad event: {e}")))
    }

    /// Iterate over events in the file
    pub fn messages(self) -> MessageIterator {
        MessageIterator {
            reader: self,
            failed: false,
        }
    }

    /// Read until `buf` is full or the file ends, returning the bytes read
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(LogFileError::io(&self.path, e)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

/// Iterator over events in a log file
///
/// Stops after the first error.
pub struct MessageIterator {
    reader: LogFileReader,
    failed: bool,
}

impl Iterator for MessageIterator {
    type Item = Result<LogMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.read_message() {
            Ok(Some(msg)) => Some(Ok(msg)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read every event in a log file, in file order
pub fn read_log_messages(path: impl AsRef<Path>) -> Result<Vec<LogMessage>> {
    LogFileReader::open(path)?.messages().collect()
}

/// Count the frames in a log file without decoding them
pub fn count_frames(path: impl AsRef<Path>) -> Result<u64> {
    let mut reader = LogFileReader::open(path)?;
    let mut count = 0;
    while reader.read_frame()?.is_some() {
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
