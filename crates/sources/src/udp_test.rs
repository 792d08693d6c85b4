//! Tests for the UDP ingest source

use super::*;

use std::time::Duration;

use chrono::{DateTime, TimeZone};
use strand_protocol::{FilterSpec, LogMessage, Uuid, decode_message, encode_message};

struct Harness {
    source: UdpIngestSource,
    buffer: Arc<IngestionBuffer>,
    registry: Arc<ViewerRegistry>,
    app: Uuid,
    viewers: Vec<Uuid>,
}

fn loopback_config() -> UdpIngestConfig {
    UdpIngestConfig {
        address: "127.0.0.1".into(),
        port: 0,
        recv_buffer_size: 64 * 1024,
        ..Default::default()
    }
}

fn harness(triggers: Vec<Arc<FlushTrigger>>) -> Harness {
    let app = Uuid::new_v4();
    let viewers: Vec<_> = (0..2).map(|_| Uuid::new_v4()).collect();
    let buffer = Arc::new(IngestionBuffer::new(16));
    let registry = Arc::new(
        ViewerRegistry::new(&AllowList::from_ids(viewers.clone()), 64).unwrap(),
    );
    let source = UdpIngestSource::bind(
        loopback_config(),
        Arc::new(AllowList::from_ids([app])),
        Arc::clone(&buffer),
        Arc::clone(&registry),
        triggers,
    )
    .unwrap();

    Harness {
        source,
        buffer,
        registry,
        app,
        viewers,
    }
}

fn datagram(msg: &LogMessage) -> Vec<u8> {
    encode_message(msg).unwrap().to_vec()
}

fn peer() -> SocketAddr {
    "127.0.0.1:9".parse().unwrap()
}

// ============================================================================
// Datagram handling
// ============================================================================

#[tokio::test]
async fn test_valid_datagram_appended_and_stamped() {
    let mut h = harness(Vec::new());
    let data = datagram(&LogMessage::new(h.app).with_client_tag(7));

    let position = h.source.process_datagram(&data, peer()).unwrap();
    assert_eq!(position, BufferPosition::new(1, 0));

    let snapshot = h.buffer.snapshot();
    let stored = snapshot.get(0).unwrap();
    assert_eq!(stored.client_tag, 7);
    assert!(stored.server_timestamp.is_some());
    assert_eq!(stored.interest_mask, 0);
}

#[tokio::test]
async fn test_stamped_event_survives_codec() {
    let mut h = harness(Vec::new());
    for tag in 0..8 {
        let data = datagram(&LogMessage::new(h.app).with_client_tag(tag));
        h.source.process_datagram(&data, peer()).unwrap();
    }

    let snapshot = h.buffer.snapshot();
    for i in 0..8 {
        let stored = snapshot.get(i).unwrap();
        let decoded = decode_message(encode_message(stored).unwrap()).unwrap();
        assert_eq!(decoded, **stored, "slot {i}");
    }
}

#[tokio::test]
async fn test_client_mask_and_timestamp_replaced() {
    let mut h = harness(Vec::new());
    let past: DateTime<Utc> = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
    let mut msg = LogMessage::new(h.app).with_server_timestamp(past);
    msg.interest_mask = u64::MAX;

    let before = Utc::now().trunc_subsecs(6);
    h.source.process_datagram(&datagram(&msg), peer()).unwrap();
    let after = Utc::now();

    let snapshot = h.buffer.snapshot();
    let stored = snapshot.get(0).unwrap();
    assert_eq!(stored.interest_mask, 0);
    let stamped = stored.server_timestamp.unwrap();
    assert!(stamped >= before && stamped <= after, "{stamped}");
}

#[tokio::test]
async fn test_malformed_datagram_dropped() {
    let mut h = harness(Vec::new());

    assert!(h.source.process_datagram(&[0xde, 0xad], peer()).is_none());
    assert!(h.source.process_datagram(&[], peer()).is_none());

    let metrics = h.source.metrics_handle().snapshot();
    assert_eq!(metrics.datagrams_received, 2);
    assert_eq!(metrics.malformed, 2);
    assert_eq!(h.buffer.position(), BufferPosition::default());
}

#[tokio::test]
async fn test_unknown_application_dropped() {
    let mut h = harness(Vec::new());
    let data = datagram(&LogMessage::new(Uuid::new_v4()));

    assert!(h.source.process_datagram(&data, peer()).is_none());
    assert_eq!(h.source.metrics_handle().snapshot().unauthorized, 1);
    assert_eq!(h.buffer.position(), BufferPosition::default());
}

#[tokio::test]
async fn test_interest_mask_follows_filter_updates() {
    let mut h = harness(Vec::new());

    h.source
        .process_datagram(&datagram(&LogMessage::new(h.app).with_level(1)), peer());

    h.registry
        .set_filter(&h.viewers[1], vec![FilterSpec::on().with_max_level(2)])
        .unwrap();
    h.source
        .process_datagram(&datagram(&LogMessage::new(h.app).with_level(1)), peer());
    h.source
        .process_datagram(&datagram(&LogMessage::new(h.app).with_level(5)), peer());

    h.registry.clear_filter(&h.viewers[1]).unwrap();
    h.source
        .process_datagram(&datagram(&LogMessage::new(h.app).with_level(1)), peer());

    let snapshot = h.buffer.snapshot();
    let masks: Vec<_> = (0..4)
        .map(|i| snapshot.get(i).unwrap().interest_mask)
        .collect();
    assert_eq!(masks, vec![0, 0b10, 0, 0]);
}

#[tokio::test]
async fn test_triggers_observe_every_append() {
    let eager = Arc::new(FlushTrigger::new(1, 16));
    let lazy = Arc::new(FlushTrigger::new(8, 16));
    let mut h = harness(vec![Arc::clone(&eager), Arc::clone(&lazy)]);

    let data = datagram(&LogMessage::new(h.app));
    h.source.process_datagram(&data, peer());
    h.source.process_datagram(&data, peer());

    // The eager trigger fires once until its consumer records progress
    assert_eq!(h.source.metrics_handle().snapshot().signals, 1);
}

// ============================================================================
// Socket
// ============================================================================

#[tokio::test]
async fn test_invalid_bind_address() {
    let config = UdpIngestConfig {
        address: "not an address".into(),
        ..loopback_config()
    };
    let result = UdpIngestSource::bind(
        config,
        Arc::new(AllowList::new()),
        Arc::new(IngestionBuffer::new(4)),
        Arc::new(ViewerRegistry::new(&AllowList::new(), 64).unwrap()),
        Vec::new(),
    );
    assert!(matches!(result, Err(UdpIngestError::InvalidAddress { .. })));
}

#[tokio::test]
async fn test_run_receives_datagrams_until_cancelled() {
    let h = harness(Vec::new());
    let addr = h.source.local_addr().unwrap();
    let metrics = h.source.metrics_handle();
    let buffer = Arc::clone(&h.buffer);
    let app = h.app;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(h.source.run(cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for tag in 0..3 {
        let data = datagram(&LogMessage::new(app).with_client_tag(tag));
        client.send_to(&data, addr).await.unwrap();
    }
    client.send_to(b"garbage", addr).await.unwrap();

    for _ in 0..200 {
        if metrics.snapshot().datagrams_received == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    let snapshot = handle.await.unwrap();
    assert_eq!(snapshot.appended, 3);
    assert_eq!(snapshot.malformed, 1);
    assert_eq!(buffer.position(), BufferPosition::new(3, 0));
}
