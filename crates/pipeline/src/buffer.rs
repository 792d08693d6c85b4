//! Fixed-capacity ingestion ring buffer
//!
//! `IngestionBuffer` holds the last N events. The ingestion loop appends;
//! consumers take snapshots. A consumer that falls more than N events behind
//! loses the oldest unread events, which is an accepted condition rather than
//! an error.

use std::sync::Arc;

use parking_lot::RwLock;

use strand_protocol::LogMessage;

/// A write position: the next slot to be written plus the number of times
/// the index has returned to 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferPosition {
    pub index: usize,
    pub wraps: u64,
}

impl BufferPosition {
    pub const fn new(index: usize, wraps: u64) -> Self {
        Self { index, wraps }
    }

    /// Total number of appends this position represents
    #[inline]
    pub fn total(&self, capacity: usize) -> u64 {
        self.wraps * capacity as u64 + self.index as u64
    }

    /// Position after `total` appends
    #[inline]
    pub fn from_total(total: u64, capacity: usize) -> Self {
        let capacity = capacity as u64;
        Self {
            index: (total % capacity) as usize,
            wraps: total / capacity,
        }
    }
}

/// Ring buffer of events
#[derive(Debug)]
pub struct IngestionBuffer {
    /// Internal storage
    inner: RwLock<BufferInner>,
    /// Fixed at construction
    capacity: usize,
}

#[derive(Debug)]
struct BufferInner {
    /// `None` until a slot is first written
    slots: Vec<Option<Arc<LogMessage>>>,
    /// Next slot to write
    write_index: usize,
    /// Times `write_index` has returned to 0
    wraps: u64,
}

impl IngestionBuffer {
    /// Create a buffer with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(BufferInner {
                slots: vec![None; capacity],
                write_index: 0,
                wraps: 0,
            }),
            capacity,
        }
    }

    /// Store an event at the write index and advance
    ///
    /// Returns the new write position.
    pub fn append(&self, msg: Arc<LogMessage>) -> BufferPosition {
        let mut inner = self.inner.write();
        let index = inner.write_index;
        inner.slots[index] = Some(msg);

        let next = index + 1;
        if next == self.capacity {
            inner.write_index = 0;
            inner.wraps += 1;
        } else {
            inner.write_index = next;
        }

        BufferPosition::new(inner.write_index, inner.wraps)
    }

    /// Copy every slot together with the write position
    ///
    /// The copy is consistent: no append interleaves with it.
    pub fn snapshot(&self) -> BufferSnapshot {
        let inner = self.inner.read();
        BufferSnapshot {
            slots: inner.slots.clone(),
            position: BufferPosition::new(inner.write_index, inner.wraps),
        }
    }

    /// Current write position
    pub fn position(&self) -> BufferPosition {
        let inner = self.inner.read();
        BufferPosition::new(inner.write_index, inner.wraps)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Point-in-time copy of an `IngestionBuffer`
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    slots: Vec<Option<Arc<LogMessage>>>,
    position: BufferPosition,
}

impl BufferSnapshot {
    /// Write position at the time of the snapshot
    #[inline]
    pub fn position(&self) -> BufferPosition {
        self.position
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Event at `index`, if the slot holds a non-empty event
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Arc<LogMessage>> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .filter(|msg| !msg.is_empty())
    }

    /// All slots, including never-written ones
    #[inline]
    pub fn slots(&self) -> &[Option<Arc<LogMessage>>] {
        &self.slots
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
