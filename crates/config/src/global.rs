//! Global configuration settings

use serde::Deserialize;

/// Default ring buffer capacity (events)
pub const DEFAULT_BUFFER_CAPACITY: usize = 1_000_000;

/// Settings shared by every component
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Number of events held in memory before the oldest is overwritten
    /// Default: 1000000
    pub buffer_capacity: usize,

    /// Grace period for tasks to finish after a shutdown signal
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: std::time::Duration,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            shutdown_timeout: std::time::Duration::from_secs(10),
        }
    }
}
