//! Tests for the ingestion buffer

use super::*;

use std::thread;

use strand_protocol::Uuid;

/// Helper to create an event tagged with its sequence number
fn make_message(seq: i64) -> Arc<LogMessage> {
    Arc::new(LogMessage::new(Uuid::new_v4()).with_client_tag(seq))
}

// ============================================================================
// Basic operations
// ============================================================================

#[test]
fn test_new_buffer_is_empty() {
    let buffer = IngestionBuffer::new(8);
    let snapshot = buffer.snapshot();

    assert_eq!(buffer.capacity(), 8);
    assert_eq!(snapshot.position(), BufferPosition::default());
    assert!(snapshot.slots().iter().all(Option::is_none));
}

#[test]
fn test_zero_capacity_clamped() {
    let buffer = IngestionBuffer::new(0);
    assert_eq!(buffer.capacity(), 1);
}

#[test]
fn test_append_returns_next_index() {
    let buffer = IngestionBuffer::new(4);

    assert_eq!(buffer.append(make_message(0)), BufferPosition::new(1, 0));
    assert_eq!(buffer.append(make_message(1)), BufferPosition::new(2, 0));
    assert_eq!(buffer.position(), BufferPosition::new(2, 0));
}

#[test]
fn test_snapshot_holds_appended_events() {
    let buffer = IngestionBuffer::new(4);
    buffer.append(make_message(10));
    buffer.append(make_message(11));

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.get(0).unwrap().client_tag, 10);
    assert_eq!(snapshot.get(1).unwrap().client_tag, 11);
    assert!(snapshot.get(2).is_none());
    assert!(snapshot.get(99).is_none());
}

#[test]
fn test_snapshot_hides_empty_events() {
    let buffer = IngestionBuffer::new(4);
    buffer.append(Arc::new(LogMessage::default()));

    let snapshot = buffer.snapshot();
    assert!(snapshot.slots()[0].is_some());
    assert!(snapshot.get(0).is_none());
}

// ============================================================================
// Wraparound
// ============================================================================

#[test]
fn test_position_after_n_appends() {
    for capacity in [1usize, 3, 5, 7] {
        for n in 0..(capacity * 4 + 2) {
            let buffer = IngestionBuffer::new(capacity);
            for i in 0..n {
                buffer.append(make_message(i as i64));
            }

            let position = buffer.snapshot().position();
            assert_eq!(position.index, n % capacity, "capacity {capacity}, n {n}");
            assert_eq!(position.wraps, (n / capacity) as u64, "capacity {capacity}, n {n}");
            assert_eq!(position.total(capacity), n as u64);
        }
    }
}

#[test]
fn test_wrap_overwrites_oldest() {
    let buffer = IngestionBuffer::new(3);
    for i in 0..5 {
        buffer.append(make_message(i));
    }

    let snapshot = buffer.snapshot();
    let tags: Vec<_> = (0..3).map(|i| snapshot.get(i).unwrap().client_tag).collect();
    assert_eq!(tags, vec![3, 4, 2]);
}

#[test]
fn test_position_total_round_trip() {
    let position = BufferPosition::from_total(17, 5);
    assert_eq!(position, BufferPosition::new(2, 3));
    assert_eq!(position.total(5), 17);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_snapshot_is_consistent_under_concurrent_appends() {
    let buffer = Arc::new(IngestionBuffer::new(64));

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..10_000 {
                buffer.append(make_message(i));
            }
        })
    };

    for _ in 0..200 {
        let snapshot = buffer.snapshot();
        let position = snapshot.position();
        let total = position.total(snapshot.capacity());

        // The slot just behind the write index always holds the newest event
        if total > 0 {
            let newest = (position.index + snapshot.capacity() - 1) % snapshot.capacity();
            assert_eq!(snapshot.get(newest).unwrap().client_tag, total as i64 - 1);
        }
    }

    producer.join().unwrap();
    assert_eq!(buffer.position().total(64), 10_000);
}
