//! UDP Ingest Source
//!
//! Receives one encoded event per datagram and appends it to the ingestion
//! buffer. This is the buffer's only producer.
//!
//! # Per-datagram steps
//!
//! 1. Decode; malformed datagrams are counted and dropped
//! 2. Drop events from applications not on the allow-list (never logged above
//!    `trace`, these are expected and frequent)
//! 3. Stamp the server receipt time, replacing any client-sent value
//! 4. Recompute the interest mask against the cached viewer table, refreshed
//!    only when the registry publishes a new generation
//! 5. Append, then let each consumer's trigger decide whether to wake it
//!
//! Ingestion is fire-and-forget: nothing is ever sent back to the client.
//!
//! # Example
//!
//! ```ignore
//! let source = UdpIngestSource::bind(config, allowed, buffer, registry, triggers)?;
//! tokio::spawn(source.run(cancel.child_token()));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{SubsecRound, Utc};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use strand_auth::AllowList;
use strand_pipeline::{BufferPosition, FlushTrigger, IngestionBuffer};
use strand_protocol::decode_message;
use strand_tap::{ViewerRegistry, ViewerTable, interest_mask};

// =============================================================================
// Constants
// =============================================================================

/// Default ingestion port
pub const DEFAULT_PORT: u16 = 7771;

/// Default socket receive buffer (4MB, absorbs bursts)
const DEFAULT_RECV_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default receive buffer per datagram
const DEFAULT_MAX_DATAGRAM_SIZE: usize = 4096;

// =============================================================================
// Configuration
// =============================================================================

/// UDP ingest source configuration
#[derive(Debug, Clone)]
pub struct UdpIngestConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Socket receive buffer size
    pub recv_buffer_size: usize,

    /// Largest datagram read; longer ones are truncated and fail to decode
    pub max_datagram_size: usize,
}

impl Default for UdpIngestConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl UdpIngestConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// UDP ingest metrics
#[derive(Debug, Default)]
pub struct UdpIngestMetrics {
    pub datagrams_received: AtomicU64,
    pub bytes_received: AtomicU64,
    pub malformed: AtomicU64,
    pub unauthorized: AtomicU64,
    pub appended: AtomicU64,
    /// Early wakeups sent to consumers
    pub signals: AtomicU64,
    pub receive_errors: AtomicU64,
}

impl UdpIngestMetrics {
    pub const fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            unauthorized: AtomicU64::new(0),
            appended: AtomicU64::new(0),
            signals: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn datagram_received(&self, bytes: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UdpIngestMetricsSnapshot {
        UdpIngestMetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unauthorized: self.unauthorized.load(Ordering::Relaxed),
            appended: self.appended.load(Ordering::Relaxed),
            signals: self.signals.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of ingest metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UdpIngestMetricsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub malformed: u64,
    pub unauthorized: u64,
    pub appended: u64,
    pub signals: u64,
    pub receive_errors: u64,
}

// =============================================================================
// Errors
// =============================================================================

/// UDP ingest source errors
#[derive(Debug, thiserror::Error)]
pub enum UdpIngestError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Bind address did not parse
    #[error("invalid bind address {address}")]
    InvalidAddress { address: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Source
// =============================================================================

/// Per-datagram ingestion state
struct Ingestor {
    allowed: Arc<AllowList>,
    buffer: Arc<IngestionBuffer>,
    registry: Arc<ViewerRegistry>,
    triggers: Vec<Arc<FlushTrigger>>,
    /// Viewer table used for interest masks
    table: Arc<ViewerTable>,
    metrics: Arc<UdpIngestMetrics>,
}

impl Ingestor {
    fn process(&mut self, data: &[u8], from: SocketAddr) -> Option<BufferPosition> {
        self.metrics.datagram_received(data.len() as u64);

        let mut msg = match decode_message(Bytes::copy_from_slice(data)) {
            Ok(msg) => msg,
            Err(e) => {
                self.metrics.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%from, error = %e, "malformed datagram dropped");
                return None;
            }
        };

        if !self.allowed.contains(&msg.application_key) {
            self.metrics.unauthorized.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(%from, application = %msg.application_key, "unauthorized application dropped");
            return None;
        }

        // Microseconds, the precision the codec carries
        msg.server_timestamp = Some(Utc::now().trunc_subsecs(6));

        if self.registry.generation() != self.table.generation() {
            self.table = self.registry.snapshot();
        }
        msg.interest_mask = interest_mask(&self.table, &msg);

        let position = self.buffer.append(Arc::new(msg));
        self.metrics.appended.fetch_add(1, Ordering::Relaxed);

        for trigger in &self.triggers {
            if trigger.observe(position) {
                self.metrics.signals.fetch_add(1, Ordering::Relaxed);
            }
        }

        Some(position)
    }
}

/// UDP source feeding the ingestion buffer
pub struct UdpIngestSource {
    config: UdpIngestConfig,
    socket: UdpSocket,
    ingestor: Ingestor,
}

impl UdpIngestSource {
    /// Bind the socket
    ///
    /// Must be called within a tokio runtime. `triggers` holds one trigger per
    /// buffer consumer.
    pub fn bind(
        config: UdpIngestConfig,
        allowed: Arc<AllowList>,
        buffer: Arc<IngestionBuffer>,
        registry: Arc<ViewerRegistry>,
        triggers: Vec<Arc<FlushTrigger>>,
    ) -> Result<Self, UdpIngestError> {
        let address = config.bind_address();
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| UdpIngestError::InvalidAddress {
                address: address.clone(),
            })?;

        let socket = create_socket(addr, config.recv_buffer_size)
            .map_err(|source| UdpIngestError::Bind { address, source })?;

        let table = registry.snapshot();
        Ok(Self {
            config,
            socket,
            ingestor: Ingestor {
                allowed,
                buffer,
                registry,
                triggers,
                table,
                metrics: Arc::new(UdpIngestMetrics::new()),
            },
        })
    }

    /// Bound address (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, UdpIngestError> {
        Ok(self.socket.local_addr()?)
    }

    /// Shared metrics, valid after `run` consumes the source
    pub fn metrics_handle(&self) -> Arc<UdpIngestMetrics> {
        Arc::clone(&self.ingestor.metrics)
    }

    /// Handle one datagram
    ///
    /// Returns the new buffer position if the event was appended.
    pub fn process_datagram(&mut self, data: &[u8], from: SocketAddr) -> Option<BufferPosition> {
        self.ingestor.process(data, from)
    }

    /// Receive until cancelled, then drop the socket
    pub async fn run(mut self, cancel: CancellationToken) -> UdpIngestMetricsSnapshot {
        tracing::info!(
            addr = ?self.socket.local_addr().ok(),
            max_datagram_size = self.config.max_datagram_size,
            "UDP ingest source listening"
        );

        let mut buf = vec![0u8; self.config.max_datagram_size.max(1)];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        self.ingestor.process(&buf[..len], from);
                    }
                    Err(e) => {
                        self.ingestor.metrics.receive_errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "UDP receive failed");
                    }
                },
            }
        }

        let snapshot = self.ingestor.metrics.snapshot();
        tracing::info!(
            received = snapshot.datagrams_received,
            appended = snapshot.appended,
            malformed = snapshot.malformed,
            unauthorized = snapshot.unauthorized,
            "UDP ingest source stopped"
        );
        snapshot
    }
}

/// Create a UDP socket with a large receive buffer
fn create_socket(addr: SocketAddr, recv_buffer_size: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod tests;
