//! Filter engine
//!
//! Evaluates a viewer's `FilterSpec` against one event. This runs once per
//! (event, live viewer) pair on the ingestion path, so it allocates nothing.
//!
//! # Filter Logic
//!
//! - Only filters in the `On` state match live events
//! - Every constraint is optional (None = no constraint)
//! - Present constraints are AND'd
//! - Transaction ids in one filter are OR'd (match any)
//! - A viewer's filters are OR'd: one match sets the viewer's bit

use strand_protocol::{FilterSpec, FilterState, LogMessage};

use crate::registry::ViewerTable;

/// True if `msg` satisfies every constraint present in `spec`
pub fn matches(spec: &FilterSpec, msg: &LogMessage) -> bool {
    spec.state == FilterState::On && matches_constraints(spec, msg)
}

/// Constraint check ignoring the filter state
///
/// Offline search applies filters regardless of their live state.
pub fn matches_constraints(spec: &FilterSpec, msg: &LogMessage) -> bool {
    if let Some(key) = spec.application_key
        && key != msg.application_key
    {
        return false;
    }

    if let Some(domain) = spec.domain
        && !domain.contains(msg.domain)
    {
        return false;
    }

    if let Some(max_level) = spec.max_level
        && msg.level > max_level
    {
        return false;
    }

    if let Some(ids) = &spec.transaction_ids
        && !ids.contains(&msg.transaction_id)
    {
        return false;
    }

    if let Some(command) = spec.command
        && command != msg.command
    {
        return false;
    }

    if spec.begin_server_timestamp.is_some() || spec.end_server_timestamp.is_some() {
        let Some(ts) = msg.server_timestamp else {
            return false;
        };
        if spec.begin_server_timestamp.is_some_and(|begin| ts < begin) {
            return false;
        }
        if spec.end_server_timestamp.is_some_and(|end| ts > end) {
            return false;
        }
    }

    true
}

/// Bitmask of every viewer in `table` with a filter matching `msg`
pub fn interest_mask(table: &ViewerTable, msg: &LogMessage) -> u64 {
    let mut mask = 0;
    for entry in table.entries() {
        let Some(filters) = &entry.filters else {
            continue;
        };
        if filters.iter().any(|spec| matches(spec, msg)) {
            mask |= entry.bit;
        }
    }
    mask
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
