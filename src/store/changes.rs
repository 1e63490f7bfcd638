use std::collections::HashSet;

use crate::path::PathKey;

/// Paths whose value differed across one `apply`.
///
/// Holds the root key when the state changed at all, the key written by a
/// path-scoped write, and the key of every subscribed path whose projected
/// value changed. Only those keys were actually compared; for any other path
/// the answer is conservative (see [`ChangedPaths::intersects`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedPaths {
    changed: HashSet<PathKey>,
    checked: HashSet<PathKey>,
}

impl ChangedPaths {
    pub fn none() -> Self {
        Self::default()
    }

    /// Record the outcome of comparing `key` across the mutation.
    pub(crate) fn record(&mut self, key: PathKey, differs: bool) {
        if differs {
            self.changed.insert(key.clone());
        }
        self.checked.insert(key);
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Number of keys known to have changed, the root included.
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Exact membership among the keys known to have changed.
    pub fn contains(&self, key: &PathKey) -> bool {
        self.changed.contains(key)
    }

    /// Whether `key` was compared during the mutation.
    pub fn was_checked(&self, key: &PathKey) -> bool {
        self.checked.contains(key)
    }

    /// Whether the value at `key` may have changed.
    ///
    /// True when a recorded change lies on `key`'s path, as ancestor or
    /// descendant. Otherwise false only if `key` or one of its ancestors was
    /// compared and found equal; an unchecked path counts as changed whenever
    /// the state changed at all.
    pub fn intersects(&self, key: &PathKey) -> bool {
        if self.changed.is_empty() {
            return false;
        }
        if key.is_root() {
            return true;
        }
        if self
            .changed
            .iter()
            .any(|changed| !changed.is_root() && changed.overlaps(key))
        {
            return true;
        }
        !self
            .checked
            .iter()
            .any(|checked| !checked.is_root() && checked.is_prefix_of(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathKey> {
        self.changed.iter()
    }
}
