//! Early wakeup for buffer consumers
//!
//! Consumers run on a timer. The ingestion loop calls [`FlushTrigger::observe`]
//! after every append; once the consumer is `threshold` entries behind, or a
//! full buffer behind, the trigger wakes it before the timer fires.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

use crate::buffer::BufferPosition;

/// Wakeup signal shared by the ingestion loop and one consumer
#[derive(Debug)]
pub struct FlushTrigger {
    notify: Notify,
    threshold: u64,
    capacity: usize,
    /// Total appends the consumer had processed at its last cycle
    consumed: AtomicU64,
    /// Set between a wakeup and the consumer's next `record`
    signalled: AtomicBool,
}

impl FlushTrigger {
    /// Trigger firing at `threshold` unread entries in a buffer of `capacity`
    pub fn new(threshold: usize, capacity: usize) -> Self {
        Self {
            notify: Notify::new(),
            threshold: threshold.max(1) as u64,
            capacity: capacity.max(1),
            consumed: AtomicU64::new(0),
            signalled: AtomicBool::new(false),
        }
    }

    /// Check the new write position, waking the consumer if it fell behind
    ///
    /// Returns true when this call sent the wakeup.
    pub fn observe(&self, position: BufferPosition) -> bool {
        let current = position.total(self.capacity);
        let behind = current.saturating_sub(self.consumed.load(Ordering::Acquire));

        if behind < self.threshold && behind < self.capacity as u64 {
            return false;
        }

        if self.signalled.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.notify.notify_one();
        true
    }

    /// Record the position a consumer has processed up to
    pub fn record(&self, position: BufferPosition) {
        self.consumed
            .store(position.total(self.capacity), Ordering::Release);
        self.signalled.store(false, Ordering::Release);
    }

    /// Wake the consumer unconditionally
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next wakeup
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
#[path = "trigger_test.rs"]
mod tests;
