//! Logging configuration
//!
//! Controls the server's own diagnostic output, not the telemetry it carries.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Minimum level of diagnostic output
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Where diagnostic lines go
///
/// `"stdout"` and `"stderr"` name the standard streams; any other string is a
/// file path, opened for append.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    #[serde(untagged)]
    File(String),
}

impl LogOutput {
    /// Path of the log file, if output goes to one
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(Path::new(path)),
            Self::Stdout | Self::Stderr => None,
        }
    }

    /// Whether colored output is appropriate
    pub fn is_terminal(&self) -> bool {
        self.file().is_none()
    }
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "/var/log/strand.log"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl LogConfig {
    /// Filter directive, with a command-line override taking precedence
    ///
    /// The override may be a bare level or a full `EnvFilter` directive such
    /// as `strand_tap=trace,info`.
    pub fn filter_directive(&self, override_level: Option<&str>) -> String {
        match override_level {
            Some(directive) => directive.to_string(),
            None => self.level.to_string(),
        }
    }
}
