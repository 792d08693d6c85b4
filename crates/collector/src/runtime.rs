//! Server runtime
//!
//! Binds both listeners, opens the log files and spawns one task per role:
//!
//! ```text
//! ingest ──→ IngestionBuffer ──→ rotator ──→ events_NNNNN.log
//!                     └────────→ fan-out ──→ ConnectionManager ──→ viewers
//! control ──→ ViewerRegistry / ConnectionManager
//! ```
//!
//! Shutdown runs in stages so nothing appended is left behind: ingestion
//! stops first, then both consumers run their final cycle, then viewer
//! connections close.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use strand_sinks::{LogFileConfig, LogFileRotator, RotatorMetricsSnapshot};
use strand_sources::{UdpIngestConfig, UdpIngestMetricsSnapshot, UdpIngestSource};
use strand_tap::{
    ControlServer, ControlServerConfig, FanoutConfig, FanoutMetricsSnapshot, ViewerFanout,
};

use crate::context::ServerContext;
use crate::error::{Result, StartupError};

/// Final metrics of each task that stopped within the shutdown timeout
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownReport {
    pub ingest: Option<UdpIngestMetricsSnapshot>,
    pub rotator: Option<RotatorMetricsSnapshot>,
    pub fanout: Option<FanoutMetricsSnapshot>,
}

/// A running server
pub struct Collector {
    udp_addr: SocketAddr,
    control_addr: SocketAddr,
    shutdown_timeout: Duration,
    root: CancellationToken,
    ingest_cancel: CancellationToken,
    consumers_cancel: CancellationToken,
    ingest: JoinHandle<UdpIngestMetricsSnapshot>,
    rotator: JoinHandle<RotatorMetricsSnapshot>,
    fanout: JoinHandle<FanoutMetricsSnapshot>,
    control: JoinHandle<strand_tap::Result<()>>,
}

impl Collector {
    /// Bind, open and spawn everything
    ///
    /// # Errors
    ///
    /// Fails if the log directory cannot be prepared or either listener
    /// cannot be bound. Nothing is spawned on failure.
    pub async fn start(ctx: ServerContext) -> Result<Self> {
        let config = &ctx.config;

        let rotator = LogFileRotator::open(
            LogFileConfig {
                path: config.log_files.path.clone(),
                max_files: config.log_files.max_files,
                max_entries_per_file: config.log_files.max_entries_per_file as u64,
                flush_interval: config.log_files.flush_interval,
            },
            Arc::clone(&ctx.buffer),
            Arc::clone(&ctx.rotator_trigger),
        )?;

        let source = UdpIngestSource::bind(
            UdpIngestConfig {
                address: config.listener.address.clone(),
                port: config.listener.port,
                recv_buffer_size: config.listener.recv_buffer_size,
                max_datagram_size: config.listener.max_datagram_size,
            },
            Arc::clone(&ctx.allowed_apps),
            Arc::clone(&ctx.buffer),
            Arc::clone(&ctx.registry),
            vec![Arc::clone(&ctx.rotator_trigger), Arc::clone(&ctx.fanout_trigger)],
        )?;
        let udp_addr = source.local_addr()?;

        let fanout = ViewerFanout::new(
            Arc::clone(&ctx.buffer),
            &ctx.registry,
            Arc::clone(&ctx.connections),
            Arc::clone(&ctx.fanout_trigger),
            FanoutConfig {
                flush_interval: config.viewers.flush_interval,
                max_frame_size: config.viewers.max_frame_size,
            },
        );

        let control_address = config.viewers.bind_address();
        let control_error = |source| StartupError::Control {
            address: control_address.clone(),
            source,
        };
        let server = ControlServer::bind(
            &control_address,
            Arc::clone(&ctx.registry),
            Arc::clone(&ctx.connections),
            ControlServerConfig {
                handshake_timeout: config.viewers.handshake_timeout,
                idle_timeout: config.viewers.idle_timeout,
                queue_size: config.viewers.queue_size,
                max_frame_size: config.viewers.max_frame_size,
            },
        )
        .await
        .map_err(control_error)?;
        let control_addr = server.local_addr().map_err(control_error)?;

        let root = CancellationToken::new();
        let ingest_cancel = root.child_token();
        let consumers_cancel = root.child_token();

        let collector = Self {
            udp_addr,
            control_addr,
            shutdown_timeout: config.global.shutdown_timeout,
            ingest: tokio::spawn(source.run(ingest_cancel.clone())),
            rotator: tokio::spawn(rotator.run(consumers_cancel.clone())),
            fanout: tokio::spawn(fanout.run(consumers_cancel.clone())),
            control: tokio::spawn(server.run(root.child_token())),
            root,
            ingest_cancel,
            consumers_cancel,
        };

        info!(
            udp = %collector.udp_addr,
            control = %collector.control_addr,
            log_dir = %config.log_files.path.display(),
            "strand server running"
        );

        Ok(collector)
    }

    /// Bound UDP ingestion address
    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    /// Bound viewer control address
    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    /// Stop every task, waiting up to the shutdown timeout for each
    pub async fn shutdown(self) -> ShutdownReport {
        let timeout = self.shutdown_timeout;

        self.ingest_cancel.cancel();
        let ingest = join("ingest", self.ingest, timeout).await;

        self.consumers_cancel.cancel();
        let rotator = join("log file rotator", self.rotator, timeout).await;
        let fanout = join("viewer fan-out", self.fanout, timeout).await;

        self.root.cancel();
        if let Some(Err(e)) = join("control server", self.control, timeout).await {
            warn!(error = %e, "control server stopped with error");
        }

        let report = ShutdownReport {
            ingest,
            rotator,
            fanout,
        };
        info!(?report, "strand server stopped");
        report
    }
}

/// Await a task, aborting it if it outlives `timeout`
async fn join<T>(name: &str, mut handle: JoinHandle<T>, timeout: Duration) -> Option<T> {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(task = name, error = %e, "task panicked during shutdown");
            None
        }
        Err(_) => {
            warn!(task = name, ?timeout, "task did not finish within timeout, aborting");
            handle.abort();
            None
        }
    }
}
