//! Catch-up window over the ring buffer
//!
//! A consumer remembers the write index it last processed up to. The entries
//! written since then form at most two half-open ranges: one when the write
//! index is ahead of the consumer, two when it has wrapped past the end.

use std::ops::Range;

/// Half-open index ranges a consumer has not yet processed, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatchUpWindow {
    first: Range<usize>,
    second: Range<usize>,
}

impl CatchUpWindow {
    /// Window between `last_seen` and `current` in a buffer of `capacity`
    ///
    /// - equal indexes: empty
    /// - `current > last_seen`: `[last_seen, current)`
    /// - `current < last_seen`: `[last_seen, capacity)` then `[0, current)`
    pub fn compute(capacity: usize, last_seen: usize, current: usize) -> Self {
        if last_seen == current {
            return Self::default();
        }

        if current > last_seen {
            Self {
                first: last_seen..current,
                second: 0..0,
            }
        } else {
            Self {
                first: last_seen..capacity,
                second: 0..current,
            }
        }
    }

    /// The whole buffer, oldest first, for a write index of `current`
    pub fn full(capacity: usize, current: usize) -> Self {
        Self {
            first: current..capacity,
            second: 0..current,
        }
    }

    /// Non-empty ranges in processing order
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        [self.first.clone(), self.second.clone()]
            .into_iter()
            .filter(|r| !r.is_empty())
    }

    /// Number of indexes covered
    #[inline]
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every index in processing order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.first.clone().chain(self.second.clone())
    }
}

#[cfg(test)]
#[path = "window_test.rs"]
mod tests;
