//! Offline search over rotated log files

use std::path::Path;

use strand_protocol::{FilterSpec, LogMessage};
use strand_sinks::{list_log_files, read_log_messages};
use strand_tap::matches_constraints;

/// Events in `dir` matching `spec`, in file-index then write order
///
/// The filter's state is ignored: every constraint it carries is applied to
/// every stored event.
///
/// # Errors
///
/// Fails on the first unreadable or corrupt file.
pub fn search_log_files(dir: &Path, spec: &FilterSpec) -> strand_sinks::Result<Vec<LogMessage>> {
    let mut found = Vec::new();
    for (_, path) in list_log_files(dir)? {
        let messages = read_log_messages(&path)?;
        tracing::debug!(path = %path.display(), events = messages.len(), "searching log file");
        found.extend(messages.into_iter().filter(|msg| matches_constraints(spec, msg)));
    }
    Ok(found)
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
