//! Per-consumer read position
//!
//! Each consumer (file rotator, viewer fan-out) owns one `ConsumerCursor`.
//! Cursors never share progress, so the two consumers run at independent
//! paces over the same buffer.

use crate::buffer::{BufferPosition, BufferSnapshot};
use crate::window::CatchUpWindow;

/// Work found by a cursor in one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    /// Indexes to process, oldest first
    pub window: CatchUpWindow,
    /// Entries overwritten before this consumer read them
    pub lost: u64,
    /// Position to commit once the window is processed
    pub position: BufferPosition,
    /// False when no slot in the window holds a live event
    pub has_data: bool,
}

/// Last position a consumer processed up to
#[derive(Debug, Clone)]
pub struct ConsumerCursor {
    last_seen: BufferPosition,
    capacity: usize,
}

impl ConsumerCursor {
    /// Cursor at the start of a buffer of `capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            last_seen: BufferPosition::default(),
            capacity: capacity.max(1),
        }
    }

    /// Compute the unread window in `snapshot`
    ///
    /// A consumer a full buffer or more behind gets the whole buffer, oldest
    /// first, and `lost` counts the entries it can no longer read.
    pub fn next_window(&self, snapshot: &BufferSnapshot) -> Pending {
        let position = snapshot.position();
        let current = position.total(self.capacity);
        let last = self.last_seen.total(self.capacity);
        let behind = current.saturating_sub(last);

        let (window, lost) = if behind >= self.capacity as u64 {
            (
                CatchUpWindow::full(self.capacity, position.index),
                behind - self.capacity as u64,
            )
        } else {
            (
                CatchUpWindow::compute(self.capacity, self.last_seen.index, position.index),
                0,
            )
        };

        let has_data = window.indices().any(|i| snapshot.get(i).is_some());

        Pending {
            window,
            lost,
            position,
            has_data,
        }
    }

    /// Record that everything before `position` has been processed
    pub fn commit(&mut self, position: BufferPosition) {
        self.last_seen = position;
    }

    #[inline]
    pub fn last_seen(&self) -> BufferPosition {
        self.last_seen
    }
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
