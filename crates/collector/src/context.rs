//! Shared server state
//!
//! Everything the tasks share is built here, once, before any socket is
//! bound. Components receive their handles explicitly; there is no global
//! state.

use std::sync::Arc;

use tracing::info;

use strand_auth::AllowList;
use strand_config::Config;
use strand_pipeline::{FlushTrigger, IngestionBuffer};
use strand_tap::{ConnectionManager, ViewerRegistry};

use crate::error::{Result, StartupError};

/// Handles shared between ingestion, both consumers and the control server
pub struct ServerContext {
    pub config: Config,
    pub allowed_apps: Arc<AllowList>,
    pub buffer: Arc<IngestionBuffer>,
    pub registry: Arc<ViewerRegistry>,
    pub connections: Arc<ConnectionManager>,
    /// Wakes the log file rotator after `log_files.flush_items` new events
    pub rotator_trigger: Arc<FlushTrigger>,
    /// Wakes the viewer fan-out after `viewers.flush_items` new events
    pub fanout_trigger: Arc<FlushTrigger>,
}

impl ServerContext {
    /// Load both allow-lists and build the shared state
    ///
    /// # Errors
    ///
    /// Fails if an allow-list cannot be read, is empty, or holds more
    /// viewers than the registry can track.
    pub fn from_config(config: Config) -> Result<Self> {
        let allowed_apps = AllowList::load(
            &config.listener.allowed_apps,
            config.listener.allowed_apps_file.as_deref(),
        )
        .map_err(|e| StartupError::allow_list("application", e))?;
        if allowed_apps.is_empty() {
            return Err(StartupError::NoApplications);
        }

        let allowed_viewers = AllowList::load(
            &config.viewers.allowed_viewers,
            config.viewers.allowed_viewers_file.as_deref(),
        )
        .map_err(|e| StartupError::allow_list("viewer", e))?;
        if allowed_viewers.is_empty() {
            return Err(StartupError::NoViewers);
        }

        let registry = ViewerRegistry::new(&allowed_viewers, config.viewers.max_viewers)
            .map_err(StartupError::Registry)?;

        let capacity = config.global.buffer_capacity;
        let buffer = Arc::new(IngestionBuffer::new(capacity));
        let rotator_trigger = Arc::new(FlushTrigger::new(config.log_files.flush_items, capacity));
        let fanout_trigger = Arc::new(FlushTrigger::new(config.viewers.flush_items, capacity));

        info!(
            buffer_capacity = buffer.capacity(),
            applications = allowed_apps.len(),
            viewers = registry.len(),
            "server context ready"
        );

        Ok(Self {
            config,
            allowed_apps: Arc::new(allowed_apps),
            buffer,
            registry: Arc::new(registry),
            connections: Arc::new(ConnectionManager::new()),
            rotator_trigger,
            fanout_trigger,
        })
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
