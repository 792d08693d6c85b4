//! Viewer control channel configuration
//!
//! The TCP endpoint viewers connect to, the viewer allow-list, and the pacing
//! of live fan-out.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

/// Default control port
pub const DEFAULT_VIEWERS_PORT: u16 = 7772;

/// Hard limit on registered viewers (one bit each in a 64-bit mask)
pub const MAX_VIEWER_SLOTS: usize = 64;

/// Viewer configuration
///
/// # Example
///
/// ```toml
/// [viewers]
/// port = 7772
/// max_viewers = 32
/// allowed_viewers_file = "configs/viewers.conf"
/// flush_interval = "1s"
/// flush_items = 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewersConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 7772
    pub port: u16,

    /// Capacity of the viewer registry
    /// Default: 32, at most 64
    pub max_viewers: usize,

    /// Allowed viewer identities, in slot order
    pub allowed_viewers: Vec<Uuid>,

    /// File of allowed viewer identities, one per line
    /// Takes precedence over `allowed_viewers` when the file exists
    pub allowed_viewers_file: Option<PathBuf>,

    /// Fan-out timer
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// New events that wake the fan-out early
    /// Default: 5000
    pub flush_items: usize,

    /// Close connections silent for this long
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Time allowed for the `Connect` frame
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,

    /// Outbound frames queued per connection
    /// Default: 64
    pub queue_size: usize,

    /// Largest control frame accepted or sent
    /// Default: 16MB
    pub max_frame_size: usize,
}

impl Default for ViewersConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_VIEWERS_PORT,
            max_viewers: 32,
            allowed_viewers: Vec::new(),
            allowed_viewers_file: None,
            flush_interval: Duration::from_secs(1),
            flush_items: 5000,
            idle_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(5),
            queue_size: 64,
            max_frame_size: 16 * 1024 * 1024,
        }
    }
}

impl ViewersConfig {
    /// Socket address to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ViewersConfig::default();
        assert_eq!(config.port, 7772);
        assert_eq!(config.max_viewers, 32);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert_eq!(config.flush_items, 5000);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_deserialize_durations() {
        let toml = r#"
flush_interval = "250ms"
idle_timeout = "2m"
"#;
        let config: ViewersConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
    }
}
