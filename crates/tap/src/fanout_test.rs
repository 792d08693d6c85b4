//! Tests for ViewerFanout

use super::*;

use bytes::Bytes;
use tokio::sync::mpsc;

use strand_auth::AllowList;

struct Harness {
    buffer: Arc<IngestionBuffer>,
    connections: Arc<ConnectionManager>,
    viewers: Vec<Uuid>,
    fanout: ViewerFanout,
}

fn harness(capacity: usize, viewers: usize, config: FanoutConfig) -> Harness {
    let ids: Vec<_> = (0..viewers).map(|_| Uuid::new_v4()).collect();
    let registry = ViewerRegistry::new(&AllowList::from_ids(ids.clone()), 64).unwrap();
    let buffer = Arc::new(IngestionBuffer::new(capacity));
    let connections = Arc::new(ConnectionManager::new());
    let trigger = Arc::new(FlushTrigger::new(100, capacity));

    let fanout = ViewerFanout::new(
        Arc::clone(&buffer),
        &registry,
        Arc::clone(&connections),
        trigger,
        config,
    );

    Harness {
        buffer,
        connections,
        viewers: ids,
        fanout,
    }
}

fn tagged(tag: i64, mask: u64) -> Arc<LogMessage> {
    let mut msg = LogMessage::new(Uuid::new_v4()).with_client_tag(tag);
    msg.interest_mask = mask;
    Arc::new(msg)
}

fn decode_tags(frame: Bytes) -> Vec<i64> {
    match ControlMessage::decode(frame.slice(4..)).unwrap() {
        ControlMessage::LogMessages(messages) => messages.iter().map(|m| m.client_tag).collect(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

// ============================================================================
// Mask decoding
// ============================================================================

#[test]
fn test_mask_decoder_slots() {
    let mut decoder = MaskDecoder::default();
    assert_eq!(&*decoder.slots(0b1010), &[1, 3]);
    assert_eq!(&*decoder.slots(1 << 63), &[63]);
    assert!(decoder.slots(0).is_empty());
    assert_eq!(decoder.cache.len(), 3);

    // Cached
    assert_eq!(&*decoder.slots(0b1010), &[1, 3]);
    assert_eq!(decoder.cache.len(), 3);
}

// ============================================================================
// Cycles
// ============================================================================

#[tokio::test]
async fn test_groups_entries_per_viewer_in_order() {
    let mut h = harness(16, 2, FanoutConfig::default());
    let (tx0, mut rx0) = mpsc::channel(8);
    let (tx1, mut rx1) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx0);
    h.connections.register(h.viewers[1], tx1);

    h.buffer.append(tagged(0, 0b01));
    h.buffer.append(tagged(1, 0b11));
    h.buffer.append(tagged(2, 0b00));
    h.buffer.append(tagged(3, 0b10));
    h.buffer.append(tagged(4, 0b01));

    assert_eq!(h.fanout.run_cycle(), 5);

    assert_eq!(decode_tags(rx0.recv().await.unwrap()), vec![0, 1, 4]);
    assert_eq!(decode_tags(rx1.recv().await.unwrap()), vec![1, 3]);
    assert!(rx0.try_recv().is_err());
    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn test_viewer_without_matches_receives_nothing() {
    let mut h = harness(8, 2, FanoutConfig::default());
    let (tx0, _rx0) = mpsc::channel(8);
    let (tx1, mut rx1) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx0);
    h.connections.register(h.viewers[1], tx1);

    h.buffer.append(tagged(0, 0b01));
    h.fanout.run_cycle();

    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn test_entries_delivered_once() {
    let mut h = harness(8, 1, FanoutConfig::default());
    let (tx, mut rx) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx);

    h.buffer.append(tagged(0, 1));
    assert_eq!(h.fanout.run_cycle(), 1);
    assert_eq!(h.fanout.run_cycle(), 0);

    h.buffer.append(tagged(1, 1));
    assert_eq!(h.fanout.run_cycle(), 1);

    assert_eq!(decode_tags(rx.recv().await.unwrap()), vec![0]);
    assert_eq!(decode_tags(rx.recv().await.unwrap()), vec![1]);
}

#[tokio::test]
async fn test_wrapped_window_delivered_oldest_first() {
    let mut h = harness(4, 1, FanoutConfig::default());
    let (tx, mut rx) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx);

    for i in 0..3 {
        h.buffer.append(tagged(i, 1));
    }
    h.fanout.run_cycle();
    rx.recv().await.unwrap();

    for i in 3..6 {
        h.buffer.append(tagged(i, 1));
    }
    h.fanout.run_cycle();
    assert_eq!(decode_tags(rx.recv().await.unwrap()), vec![3, 4, 5]);
}

#[tokio::test]
async fn test_lost_entries_counted() {
    let mut h = harness(4, 1, FanoutConfig::default());
    let (tx, mut rx) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx);

    for i in 0..10 {
        h.buffer.append(tagged(i, 1));
    }
    h.fanout.run_cycle();

    assert_eq!(decode_tags(rx.recv().await.unwrap()), vec![6, 7, 8, 9]);
    assert_eq!(h.fanout.metrics_handle().snapshot().entries_lost, 6);
}

#[tokio::test]
async fn test_large_batch_split_into_frames() {
    let config = FanoutConfig {
        max_frame_size: 256,
        ..Default::default()
    };
    let mut h = harness(64, 1, config);
    let (tx, mut rx) = mpsc::channel(64);
    h.connections.register(h.viewers[0], tx);

    for i in 0..20 {
        h.buffer.append(tagged(i, 1));
    }
    assert_eq!(h.fanout.run_cycle(), 20);

    let mut tags = Vec::new();
    let mut frames = 0;
    while let Ok(frame) = rx.try_recv() {
        assert!(frame.len() - 4 <= 256);
        tags.extend(decode_tags(frame));
        frames += 1;
    }
    assert!(frames > 1);
    assert_eq!(tags, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_disconnected_viewer_dropped() {
    let mut h = harness(8, 1, FanoutConfig::default());
    h.buffer.append(tagged(0, 1));

    assert_eq!(h.fanout.run_cycle(), 0);
    assert_eq!(h.fanout.metrics_handle().snapshot().batches_dropped, 1);
}

#[tokio::test]
async fn test_placeholder_buffer_is_skipped() {
    let mut h = harness(4, 1, FanoutConfig::default());
    h.buffer.append(Arc::new(LogMessage::default()));

    assert_eq!(h.fanout.run_cycle(), 0);
    assert_eq!(h.fanout.cursor.last_seen(), h.buffer.position());
}

// ============================================================================
// Run loop
// ============================================================================

#[tokio::test]
async fn test_run_flushes_on_cancel() {
    let config = FanoutConfig {
        flush_interval: Duration::from_secs(3600),
        ..Default::default()
    };
    let h = harness(8, 1, config);
    let (tx, mut rx) = mpsc::channel(8);
    h.connections.register(h.viewers[0], tx);
    h.buffer.append(tagged(7, 1));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let snapshot = h.fanout.run(cancel).await;

    assert_eq!(snapshot.messages_delivered, 1);
    assert_eq!(decode_tags(rx.recv().await.unwrap()), vec![7]);
}
