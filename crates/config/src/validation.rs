//! Configuration validation
//!
//! Validates config consistency:
//! - Capacities and limits are non-zero
//! - The viewer registry fits in a 64-bit interest mask
//! - Listener and control server do not claim the same endpoint

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::viewers::MAX_VIEWER_SLOTS;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_global(config)?;
    validate_listener(config)?;
    validate_viewers(config)?;
    validate_log_files(config)?;
    validate_endpoints(config)?;
    Ok(())
}

fn validate_global(config: &Config) -> Result<()> {
    if config.global.buffer_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "global",
            "buffer_capacity",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_listener(config: &Config) -> Result<()> {
    if config.listener.max_datagram_size == 0 {
        return Err(ConfigError::invalid_value(
            "listener",
            "max_datagram_size",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_viewers(config: &Config) -> Result<()> {
    let viewers = &config.viewers;

    if viewers.max_viewers == 0 || viewers.max_viewers > MAX_VIEWER_SLOTS {
        return Err(ConfigError::invalid_value(
            "viewers",
            "max_viewers",
            format!("must be between 1 and {MAX_VIEWER_SLOTS}"),
        ));
    }
    if viewers.flush_items == 0 {
        return Err(ConfigError::invalid_value(
            "viewers",
            "flush_items",
            "must be greater than 0",
        ));
    }
    if viewers.queue_size == 0 {
        return Err(ConfigError::invalid_value(
            "viewers",
            "queue_size",
            "must be greater than 0",
        ));
    }
    if viewers.flush_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "viewers",
            "flush_interval",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_log_files(config: &Config) -> Result<()> {
    let files = &config.log_files;

    if files.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid_value("log_files", "path", "must not be empty"));
    }
    if files.max_files == 0 {
        return Err(ConfigError::invalid_value(
            "log_files",
            "max_files",
            "must be greater than 0",
        ));
    }
    if files.max_entries_per_file == 0 {
        return Err(ConfigError::invalid_value(
            "log_files",
            "max_entries_per_file",
            "must be greater than 0",
        ));
    }
    if files.flush_items == 0 {
        return Err(ConfigError::invalid_value(
            "log_files",
            "flush_items",
            "must be greater than 0",
        ));
    }
    if files.flush_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "log_files",
            "flush_interval",
            "must be greater than 0",
        ));
    }
    Ok(())
}

/// Reject a listener and control server on the same address and port
fn validate_endpoints(config: &Config) -> Result<()> {
    let listener = &config.listener;
    let viewers = &config.viewers;

    if listener.port != 0 && listener.port == viewers.port && listener.address == viewers.address {
        return Err(ConfigError::port_conflict(&listener.address, listener.port));
    }
    Ok(())
}
