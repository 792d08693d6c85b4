//! Startup error types

use thiserror::Error;

use strand_auth::AuthError;
use strand_sinks::LogFileError;
use strand_sources::UdpIngestError;
use strand_tap::TapError;

/// Result type for server startup
pub type Result<T> = std::result::Result<T, StartupError>;

/// Errors that prevent the server from starting
///
/// Every variant is fatal: nothing is bound or spawned until the whole
/// context has been built.
#[derive(Debug, Error)]
pub enum StartupError {
    /// An allow-list could not be loaded
    #[error("failed to load {list} allow-list: {source}")]
    AllowList {
        list: &'static str,
        #[source]
        source: AuthError,
    },

    /// No application may send events
    #[error("no applications allowed: configure listener.allowed_apps or listener.allowed_apps_file")]
    NoApplications,

    /// No viewer may connect
    #[error("no viewers allowed: configure viewers.allowed_viewers or viewers.allowed_viewers_file")]
    NoViewers,

    /// The viewer allow-list does not fit the registry
    #[error("viewer registry: {0}")]
    Registry(#[source] TapError),

    /// The log file directory could not be prepared
    #[error("log files: {0}")]
    LogFiles(#[from] LogFileError),

    /// The UDP listener could not be bound
    #[error("ingest listener: {0}")]
    Ingest(#[from] UdpIngestError),

    /// The control listener could not be bound
    #[error("control listener on {address}: {source}")]
    Control {
        address: String,
        #[source]
        source: TapError,
    },
}

impl StartupError {
    pub(crate) fn allow_list(list: &'static str, source: AuthError) -> Self {
        Self::AllowList { list, source }
    }
}
