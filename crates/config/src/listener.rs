//! Ingestion listener configuration
//!
//! The UDP endpoint applications send events to, and the allow-list of
//! applications whose events are accepted.

use std::path::PathBuf;

use serde::Deserialize;
use uuid::Uuid;

/// Default ingestion port
pub const DEFAULT_LISTENER_PORT: u16 = 7771;

/// Ingestion listener configuration
///
/// # Example
///
/// ```toml
/// [listener]
/// port = 7771
/// allowed_apps_file = "configs/apps.conf"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 7771
    pub port: u16,

    /// Socket receive buffer size (bytes)
    /// Default: 4194304 (4MB)
    pub recv_buffer_size: usize,

    /// Largest datagram accepted
    /// Default: 4096
    pub max_datagram_size: usize,

    /// Allowed application keys
    pub allowed_apps: Vec<Uuid>,

    /// File of allowed application keys, one per line
    /// Takes precedence over `allowed_apps` when the file exists
    pub allowed_apps_file: Option<PathBuf>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_LISTENER_PORT,
            recv_buffer_size: 4 * 1024 * 1024,
            max_datagram_size: 4096,
            allowed_apps: Vec::new(),
            allowed_apps_file: None,
        }
    }
}

impl ListenerConfig {
    /// Socket address to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
