//! TCP control server for viewer connections
//!
//! `ControlServer` accepts viewer connections and handles their control
//! frames. Events themselves are pushed by `ViewerFanout` through the
//! connection's outbound queue.
//!
//! # Protocol
//!
//! All frames are length-prefixed: `[4-byte big-endian length][tag][payload]`
//!
//! Viewer → Server:
//! - `Connect` - First frame; carries the viewer identity
//! - `Ping` - Keep-alive, resets the idle timer
//! - `SetFilter` - Replace the viewer's filters (empty list clears)
//! - `GetFilter` - Request the current filters
//! - `Disconnect` - Close the connection
//!
//! Server → Viewer:
//! - `CurrentFilter` - Reply to `GetFilter`
//! - `LogMessages` - A batch of matching events
//!
//! Closing a connection clears the viewer's filters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use strand_protocol::{
    ControlMessage, DEFAULT_MAX_FRAME_SIZE, ProtocolError, Uuid, read_length_prefix,
};

use crate::connection::ConnectionManager;
use crate::error::{Result, TapError};
use crate::registry::ViewerRegistry;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ControlServerConfig {
    /// Time allowed between accept and the `Connect` frame
    pub handshake_timeout: Duration,
    /// Close connections silent for this long
    pub idle_timeout: Duration,
    /// Outbound frames queued per connection
    pub queue_size: usize,
    /// Largest accepted frame body
    pub max_frame_size: usize,
}

impl Default for ControlServerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            queue_size: 64,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// State shared by every connection task
struct Shared {
    config: ControlServerConfig,
    registry: Arc<ViewerRegistry>,
    connections: Arc<ConnectionManager>,
}

/// TCP server for viewer control connections
pub struct ControlServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl ControlServer {
    /// Bind the listener
    pub async fn bind(
        addr: &str,
        registry: Arc<ViewerRegistry>,
        connections: Arc<ConnectionManager>,
        config: ControlServerConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                config,
                registry,
                connections,
            }),
        })
    }

    /// Bound address (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "control server listening");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let shared = Arc::clone(&self.shared);
                        let cancel = cancel.child_token();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, shared, cancel).await {
                                debug!(%peer, error = %e, "viewer connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                },
            }
        }

        info!("control server stopped");
        Ok(())
    }
}

/// Handle a single viewer connection
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) -> Result<()> {
    let _ = stream.set_nodelay(true);
    let (mut reader, mut writer) = stream.into_split();
    let max_frame_size = shared.config.max_frame_size;

    let viewer = match timeout(
        shared.config.handshake_timeout,
        read_frame(&mut reader, max_frame_size),
    )
    .await
    {
        Err(_) => return Err(TapError::handshake("timed out waiting for Connect")),
        Ok(Ok(Some(ControlMessage::Connect { viewer_id }))) => viewer_id,
        Ok(Ok(Some(other))) => {
            return Err(TapError::handshake(format!(
                "expected Connect, got tag {}",
                other.tag()
            )));
        }
        Ok(Ok(None)) => return Ok(()),
        Ok(Err(e)) => return Err(e),
    };

    if shared.registry.lookup(&viewer).is_none() {
        warn!(%peer, viewer = %viewer, "rejected viewer not on allow-list");
        return Err(TapError::UnknownViewer { id: viewer });
    }

    let (sender, mut receiver) = mpsc::channel::<Bytes>(shared.config.queue_size.max(1));
    let connection = shared.connections.register(viewer, sender.clone());

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = receiver.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                debug!(viewer = %viewer, error = %e, "failed to write to viewer");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    info!(%peer, viewer = %viewer, "viewer connected");

    let result = serve_viewer(&mut reader, viewer, &sender, &shared, &cancel).await;

    if shared.connections.unregister(&viewer, connection)
        && let Err(e) = shared.registry.clear_filter(&viewer)
    {
        warn!(viewer = %viewer, error = %e, "failed to clear filters");
    }

    // Let queued replies drain before the writer exits
    drop(sender);
    let abort = writer_task.abort_handle();
    if timeout(Duration::from_secs(1), writer_task).await.is_err() {
        debug!(viewer = %viewer, "writer did not drain in time");
        abort.abort();
    }

    info!(%peer, viewer = %viewer, "viewer disconnected");
    result
}

/// Read loop for an authenticated viewer
async fn serve_viewer(
    reader: &mut OwnedReadHalf,
    viewer: Uuid,
    sender: &mpsc::Sender<Bytes>,
    shared: &Shared,
    cancel: &CancellationToken,
) -> Result<()> {
    let max_frame_size = shared.config.max_frame_size;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            frame = timeout(shared.config.idle_timeout, read_frame(reader, max_frame_size)) => frame,
        };

        let msg = match frame {
            Err(_) => {
                info!(viewer = %viewer, timeout = ?shared.config.idle_timeout, "viewer idle, closing");
                return Ok(());
            }
            Ok(Ok(Some(msg))) => msg,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e),
        };

        match msg {
            ControlMessage::Ping => trace!(viewer = %viewer, "ping"),
            ControlMessage::SetFilter(filters) => {
                let count = filters.len();
                shared.registry.set_filter(&viewer, filters)?;
                info!(viewer = %viewer, filters = count, "filter updated");
            }
            ControlMessage::GetFilter => {
                let filters = shared.registry.filters(&viewer)?;
                let reply = ControlMessage::CurrentFilter(filters).encode()?;
                sender
                    .send(reply)
                    .await
                    .map_err(|_| TapError::ChannelClosed)?;
            }
            ControlMessage::Disconnect => {
                debug!(viewer = %viewer, "viewer requested disconnect");
                return Ok(());
            }
            ControlMessage::Unknown(tag) => {
                warn!(viewer = %viewer, tag, "unknown operation ignored");
            }
            other => {
                warn!(viewer = %viewer, tag = other.tag(), "unexpected operation ignored");
            }
        }
    }
}

/// Read one length-prefixed control frame
///
/// Returns `Ok(None)` on a clean end of stream before a frame starts.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> Result<Option<ControlMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = read_length_prefix(&len_buf).unwrap_or_default() as usize;
    if len > max_frame_size {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        }
        .into());
    }

    let mut buf = BytesMut::zeroed(len);
    reader.read_exact(&mut buf).await?;
    Ok(Some(ControlMessage::decode(buf.freeze())?))
}

/// Encode and write one control frame
pub async fn write_frame<W>(writer: &mut W, msg: &ControlMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&msg.encode()?).await?;
    Ok(())
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
