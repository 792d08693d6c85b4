//! Viewer registry with copy-on-write filter updates
//!
//! Every allow-listed viewer owns one slot, and therefore one interest bit,
//! for the lifetime of the server. Filter updates build a new `ViewerTable`
//! generation off to the side and publish it with a single atomic swap, so
//! readers always see one complete generation and never wait on a writer.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use strand_auth::AllowList;
use strand_protocol::{FilterSpec, Uuid};

use crate::error::{Result, TapError};

/// Hard ceiling on viewers: one bit each in a `u64` interest mask
pub const MAX_VIEWERS: usize = 64;

/// One viewer slot
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerEntry {
    pub id: Uuid,
    pub slot: usize,
    /// `1 << slot`
    pub bit: u64,
    /// `None` until the viewer sets a filter
    pub filters: Option<Arc<[FilterSpec]>>,
}

/// Immutable generation of the viewer table
#[derive(Debug, Clone, Default)]
pub struct ViewerTable {
    entries: Vec<ViewerEntry>,
    generation: u64,
}

impl ViewerTable {
    /// All slots in slot order
    #[inline]
    pub fn entries(&self) -> &[ViewerEntry] {
        &self.entries
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&ViewerEntry> {
        self.entries.get(slot)
    }

    /// Incremented on every published update
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Viewers holding at least one filter
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.filters.is_some()).count()
    }
}

/// Hot-swapped table of viewer slots
pub struct ViewerRegistry {
    /// Current generation; readers load it without locking
    active: ArcSwap<ViewerTable>,
    /// Serializes writers building the next generation
    write_lock: Mutex<()>,
    /// Identity to slot, fixed at startup
    slots: HashMap<Uuid, usize>,
}

impl ViewerRegistry {
    /// Assign a slot to every viewer on `allowed`, in list order
    ///
    /// # Errors
    ///
    /// Returns `TooManyViewers` if the list exceeds `max_viewers` or the
    /// 64-bit interest mask.
    pub fn new(allowed: &AllowList, max_viewers: usize) -> Result<Self> {
        let max = max_viewers.min(MAX_VIEWERS);
        if allowed.len() > max {
            return Err(TapError::TooManyViewers {
                count: allowed.len(),
                max,
            });
        }

        let entries: Vec<_> = allowed
            .ids()
            .iter()
            .enumerate()
            .map(|(slot, id)| ViewerEntry {
                id: *id,
                slot,
                bit: 1u64 << slot,
                filters: None,
            })
            .collect();

        let slots = entries.iter().map(|e| (e.id, e.slot)).collect();

        Ok(Self {
            active: ArcSwap::from_pointee(ViewerTable {
                entries,
                generation: 0,
            }),
            write_lock: Mutex::new(()),
            slots,
        })
    }

    /// Slot assigned to `id`
    #[inline]
    pub fn lookup(&self, id: &Uuid) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Replace the filters of `id`; an empty list clears them
    pub fn set_filter(&self, id: &Uuid, filters: Vec<FilterSpec>) -> Result<()> {
        let filters = (!filters.is_empty()).then(|| Arc::from(filters));
        self.publish(id, filters)
    }

    /// Remove every filter of `id`
    pub fn clear_filter(&self, id: &Uuid) -> Result<()> {
        self.publish(id, None)
    }

    /// Current filters of `id` (empty when none are set)
    pub fn filters(&self, id: &Uuid) -> Result<Vec<FilterSpec>> {
        let slot = self.slot(id)?;
        let table = self.active.load();
        Ok(table
            .get(slot)
            .and_then(|e| e.filters.as_deref())
            .map(<[FilterSpec]>::to_vec)
            .unwrap_or_default())
    }

    /// Current generation, shared with the caller
    #[inline]
    pub fn snapshot(&self) -> Arc<ViewerTable> {
        self.active.load_full()
    }

    /// Generation of the current table
    #[inline]
    pub fn generation(&self) -> u64 {
        self.active.load().generation
    }

    /// Number of registered viewers
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, id: &Uuid) -> Result<usize> {
        self.lookup(id).ok_or(TapError::UnknownViewer { id: *id })
    }

    /// Copy the active table, change one slot, swap the copy in
    fn publish(&self, id: &Uuid, filters: Option<Arc<[FilterSpec]>>) -> Result<()> {
        let slot = self.slot(id)?;

        let _guard = self.write_lock.lock();
        let current = self.active.load();
        let mut next = ViewerTable {
            entries: current.entries.clone(),
            generation: current.generation + 1,
        };
        next.entries[slot].filters = filters;

        debug!(
            viewer = %id,
            slot,
            generation = next.generation,
            active = next.active_count(),
            "viewer table updated"
        );
        self.active.store(Arc::new(next));
        Ok(())
    }
}

impl std::fmt::Debug for ViewerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerRegistry")
            .field("viewers", &self.slots.len())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
