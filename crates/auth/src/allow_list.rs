//! Ordered identifier allow-list
//!
//! Lookup is O(1) and allocation-free; the list is immutable once loaded.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{AuthError, Result};

/// Ordered set of allowed identifiers
///
/// Insertion order is preserved: the first occurrence of an identifier
/// defines its slot, later duplicates are ignored.
///
/// # Example
///
/// ```
/// use strand_auth::AllowList;
/// use uuid::Uuid;
///
/// let a = Uuid::new_v4();
/// let b = Uuid::new_v4();
/// let list = AllowList::from_ids([a, b, a]);
///
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.slot(&b), Some(1));
/// assert!(list.contains(&a));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ids: Vec<Uuid>,
    slots: HashMap<Uuid, usize>,
}

impl AllowList {
    /// Create an empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from identifiers, keeping first occurrences
    pub fn from_ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        let mut list = Self::new();
        for id in ids {
            list.insert(id);
        }
        list
    }

    /// Load a list from a file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not a non-nil
    /// UUID.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| AuthError::read(path, e))?;

        Self::from_str(&contents)
    }

    /// Resolve a configured list
    ///
    /// An existing `file` takes precedence over `inline`; a configured file
    /// that does not exist falls back to `inline`.
    pub fn load(inline: &[Uuid], file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            if path.exists() {
                let list = Self::from_file(path)?;
                tracing::info!(
                    path = %path.display(),
                    count = list.len(),
                    "loaded allow-list file"
                );
                return Ok(list);
            }
            tracing::warn!(
                path = %path.display(),
                "allow-list file not found, using inline identifiers"
            );
        }

        if let Some(pos) = inline.iter().position(Uuid::is_nil) {
            return Err(AuthError::nil_id(pos + 1));
        }
        Ok(Self::from_ids(inline.iter().copied()))
    }

    /// Add an identifier; returns false if it was already present
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.slots.contains_key(&id) {
            return false;
        }
        self.slots.insert(id, self.ids.len());
        self.ids.push(id);
        true
    }

    /// Check if an identifier is allowed (hot path)
    #[inline]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.slots.contains_key(id)
    }

    /// Position of an identifier in the list
    #[inline]
    pub fn slot(&self, id: &Uuid) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Identifiers in slot order
    #[inline]
    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Parse a list from file contents
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(contents: &str) -> Result<Self> {
        let mut list = Self::new();

        for (line_num, line) in contents.lines().enumerate() {
            let line_num = line_num + 1; // 1-based line numbers
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let id = Uuid::parse_str(line).map_err(|e| AuthError::invalid_id(line_num, line, e))?;
            if id.is_nil() {
                return Err(AuthError::nil_id(line_num));
            }

            if !list.insert(id) {
                tracing::debug!(line = line_num, %id, "duplicate identifier ignored");
            }
        }

        Ok(list)
    }
}

impl FromStr for AllowList {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[path = "allow_list_test.rs"]
mod tests;
