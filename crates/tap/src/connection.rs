//! Live viewer connections
//!
//! `ConnectionManager` maps a viewer identity to the outbound queue of its
//! current connection. The fan-out pushes encoded frames into the queue; a
//! per-connection writer task drains it onto the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use strand_protocol::Uuid;

use crate::error::{Result, TapError};

/// Identifies one connection of a viewer
pub type ConnectionId = u64;

/// Registered connection
#[derive(Debug)]
struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<Bytes>,
}

/// Viewer identity to outbound queue
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, Connection>>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `viewer`, replacing any previous one
    ///
    /// A viewer reconnecting before its old connection is noticed as dead
    /// takes over delivery immediately.
    pub fn register(&self, viewer: Uuid, sender: mpsc::Sender<Bytes>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.connections
            .write()
            .insert(viewer, Connection { id, sender });
        id
    }

    /// Remove the connection of `viewer` if it is still `connection`
    ///
    /// Returns false when a newer connection has taken over.
    pub fn unregister(&self, viewer: &Uuid, connection: ConnectionId) -> bool {
        let mut connections = self.connections.write();
        match connections.get(viewer) {
            Some(current) if current.id == connection => {
                connections.remove(viewer);
                true
            }
            _ => false,
        }
    }

    /// Queue a frame for `viewer` without waiting
    pub fn send(&self, viewer: &Uuid, frame: Bytes) -> Result<()> {
        let connections = self.connections.read();
        let connection = connections
            .get(viewer)
            .ok_or(TapError::NotConnected { id: *viewer })?;

        connection.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TapError::QueueFull { id: *viewer },
            mpsc::error::TrySendError::Closed(_) => TapError::ChannelClosed,
        })
    }

    #[inline]
    pub fn is_connected(&self, viewer: &Uuid) -> bool {
        self.connections.read().contains_key(viewer)
    }

    /// Number of connected viewers
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
