//! Viewer fan-out
//!
//! `ViewerFanout` is the second consumer of the ingestion buffer. Each cycle
//! it reads the entries written since its last cycle, decodes every entry's
//! interest mask into the viewers it was tagged for, and pushes one batch per
//! viewer onto that viewer's connection queue.
//!
//! # Example
//!
//! ```ignore
//! let fanout = ViewerFanout::new(buffer, registry, connections, trigger, config);
//! tokio::spawn(fanout.run(cancel.child_token()));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use strand_pipeline::{ConsumerCursor, FlushTrigger, IngestionBuffer};
use strand_protocol::{ControlMessage, DEFAULT_MAX_FRAME_SIZE, LogMessage, Uuid};

use crate::connection::ConnectionManager;
use crate::registry::ViewerRegistry;

/// Cached masks before the decoder starts over
const MAX_CACHED_MASKS: usize = 4096;

/// Configuration for the fan-out task
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Longest wait between cycles without a trigger
    pub flush_interval: Duration,

    /// Largest `LogMessages` frame sent to a viewer
    pub max_frame_size: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(1),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Metrics for the fan-out task
#[derive(Debug, Default)]
pub struct FanoutMetrics {
    pub cycles: AtomicU64,
    pub messages_delivered: AtomicU64,
    pub batches_sent: AtomicU64,
    pub batches_dropped: AtomicU64,
    pub entries_lost: AtomicU64,
}

impl FanoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FanoutMetricsSnapshot {
        FanoutMetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            entries_lost: self.entries_lost.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of fan-out metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutMetricsSnapshot {
    pub cycles: u64,
    pub messages_delivered: u64,
    pub batches_sent: u64,
    pub batches_dropped: u64,
    pub entries_lost: u64,
}

/// Interest mask to viewer slots, memoized per distinct mask
///
/// Most events share one of a handful of masks, so the bit scan runs once per
/// mask value rather than once per event.
#[derive(Debug, Default)]
struct MaskDecoder {
    cache: HashMap<u64, Arc<[usize]>>,
}

impl MaskDecoder {
    fn slots(&mut self, mask: u64) -> Arc<[usize]> {
        if let Some(slots) = self.cache.get(&mask) {
            return Arc::clone(slots);
        }

        if self.cache.len() >= MAX_CACHED_MASKS {
            self.cache.clear();
        }

        let slots: Arc<[usize]> = (0..64).filter(|bit| mask & (1u64 << bit) != 0).collect();
        self.cache.insert(mask, Arc::clone(&slots));
        slots
    }
}

/// Periodic consumer that delivers tagged events to viewers
pub struct ViewerFanout {
    config: FanoutConfig,
    buffer: Arc<IngestionBuffer>,
    connections: Arc<ConnectionManager>,
    trigger: Arc<FlushTrigger>,
    cursor: ConsumerCursor,
    decoder: MaskDecoder,
    /// Viewer identity by slot, fixed at startup
    viewers: Vec<Uuid>,
    metrics: Arc<FanoutMetrics>,
}

impl ViewerFanout {
    pub fn new(
        buffer: Arc<IngestionBuffer>,
        registry: &ViewerRegistry,
        connections: Arc<ConnectionManager>,
        trigger: Arc<FlushTrigger>,
        config: FanoutConfig,
    ) -> Self {
        let viewers = registry
            .snapshot()
            .entries()
            .iter()
            .map(|entry| entry.id)
            .collect();

        Self {
            cursor: ConsumerCursor::new(buffer.capacity()),
            config,
            buffer,
            connections,
            trigger,
            decoder: MaskDecoder::default(),
            viewers,
            metrics: Arc::new(FanoutMetrics::new()),
        }
    }

    /// Shared metrics, valid after `run` consumes the fan-out
    pub fn metrics_handle(&self) -> Arc<FanoutMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Deliver every entry written since the previous cycle
    ///
    /// Returns the number of events queued to viewers.
    pub fn run_cycle(&mut self) -> u64 {
        self.metrics.cycles.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.buffer.snapshot();
        let pending = self.cursor.next_window(&snapshot);

        if pending.lost > 0 {
            tracing::warn!(lost = pending.lost, "fan-out fell behind, entries overwritten");
            self.metrics
                .entries_lost
                .fetch_add(pending.lost, Ordering::Relaxed);
        }

        if !pending.has_data {
            self.cursor.commit(pending.position);
            self.trigger.record(pending.position);
            return 0;
        }

        let mut batches: Vec<Vec<Arc<LogMessage>>> = vec![Vec::new(); self.viewers.len()];
        for index in pending.window.indices() {
            let Some(msg) = snapshot.get(index) else {
                continue;
            };
            if msg.interest_mask == 0 {
                continue;
            }
            for &slot in self.decoder.slots(msg.interest_mask).iter() {
                if let Some(batch) = batches.get_mut(slot) {
                    batch.push(Arc::clone(msg));
                }
            }
        }

        let mut delivered = 0;
        for (slot, batch) in batches.iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            delivered += self.deliver(&self.viewers[slot], batch);
        }

        tracing::debug!(
            from = ?self.cursor.last_seen(),
            to = ?pending.position,
            entries = pending.window.len(),
            delivered,
            "fan-out cycle"
        );

        self.cursor.commit(pending.position);
        self.trigger.record(pending.position);
        delivered
    }

    /// Queue one viewer's batch, split into frames no larger than the limit
    fn deliver(&self, viewer: &Uuid, batch: &[Arc<LogMessage>]) -> u64 {
        if !self.connections.is_connected(viewer) {
            tracing::debug!(viewer = %viewer, entries = batch.len(), "viewer not connected, batch dropped");
            self.metrics.batches_dropped.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let frames = match ControlMessage::encode_log_batches(batch, self.config.max_frame_size) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!(viewer = %viewer, error = %e, "failed to encode batch");
                self.metrics.batches_dropped.fetch_add(1, Ordering::Relaxed);
                return 0;
            }
        };

        for frame in frames {
            if let Err(e) = self.connections.send(viewer, frame) {
                tracing::warn!(viewer = %viewer, error = %e, "failed to queue batch");
                self.metrics.batches_dropped.fetch_add(1, Ordering::Relaxed);
                return 0;
            }
            self.metrics.batches_sent.fetch_add(1, Ordering::Relaxed);
        }

        let count = batch.len() as u64;
        self.metrics
            .messages_delivered
            .fetch_add(count, Ordering::Relaxed);
        count
    }

    /// Run cycles on the flush interval or trigger until cancelled
    ///
    /// A final cycle runs after cancellation so the buffer's tail is not
    /// dropped. Returns the final metrics snapshot.
    pub async fn run(mut self, cancel: CancellationToken) -> FanoutMetricsSnapshot {
        tracing::info!(
            viewers = self.viewers.len(),
            interval = ?self.config.flush_interval,
            "viewer fan-out starting"
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

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            cycles = snapshot.cycles,
            delivered = snapshot.messages_delivered,
            batches = snapshot.batches_sent,
            dropped = snapshot.batches_dropped,
            lost = snapshot.entries_lost,
            "viewer fan-out shutting down"
        );
        snapshot
    }
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
