//! Rotating log file configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Rotating log file configuration
///
/// # Example
///
/// ```toml
/// [log_files]
/// path = "/var/lib/strand"
/// max_files = 10
/// max_entries_per_file = 100000
/// flush_items = 20000
/// flush_interval = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogFilesConfig {
    /// Directory holding `events_NNNNN.log` files
    /// Default: `<system temp>/strand`
    pub path: PathBuf,

    /// Number of files before the oldest index is reused
    /// Default: 10
    pub max_files: usize,

    /// Frames per file before rotating
    /// Default: 100000
    pub max_entries_per_file: usize,

    /// New events that wake the rotator early
    /// Default: 20000
    pub flush_items: usize,

    /// Rotator timer
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for LogFilesConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("strand"),
            max_files: 10,
            max_entries_per_file: 100_000,
            flush_items: 20_000,
            flush_interval: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogFilesConfig::default();
        assert!(config.path.ends_with("strand"));
        assert_eq!(config.max_files, 10);
        assert_eq!(config.max_entries_per_file, 100_000);
        assert_eq!(config.flush_items, 20_000);
        assert_eq!(config.flush_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
path = "/data/strand"
max_files = 3
"#;
        let config: LogFilesConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.path, PathBuf::from("/data/strand"));
        assert_eq!(config.max_files, 3);
        assert_eq!(config.max_entries_per_file, 100_000);
    }
}
