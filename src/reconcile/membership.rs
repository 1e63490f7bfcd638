use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Read-only, shared view of which identities a container currently holds.
///
/// Handed to event routers so delivery can be validated against membership
/// at the moment an event is delivered.
pub struct Membership<Id> {
    inner: Arc<RwLock<HashSet<Id>>>,
}

impl<Id> Clone for Membership<Id> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Id: Eq + Hash> Default for Membership<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Eq + Hash> Membership<Id> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.inner.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub(crate) fn replace(&self, ids: impl IntoIterator<Item = Id>) {
        let next: HashSet<Id> = ids.into_iter().collect();
        *self.inner.write() = next;
    }
}
