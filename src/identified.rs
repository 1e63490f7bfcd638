//! Ordered collections keyed by a stable identity.
//!
//! [`IdentifiedVec`] keeps insertion order like a `Vec` while offering O(1)
//! lookup by identity. It is the collection shape that element projections
//! and reconciliation operate on.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reconcile::ReconcileError;

/// Values that carry their own stable identity.
pub trait Identifiable {
    type Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// Ordered, identity-keyed collection.
///
/// Identities are unique; building from a sequence with repeated identities
/// fails with [`ReconcileError::IdentityCollision`] instead of overwriting.
///
/// Elements are shared between clones. Cloning is O(1), and a write copies
/// the index (one pointer per element) plus the single element it touches,
/// never the other elements. Equality skips elements that are still shared.
pub struct IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
{
    items: Arc<IndexMap<Id, Arc<T>>>,
}

impl<Id, T> Clone for IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<Id, T> Default for IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
{
    fn default() -> Self {
        Self {
            items: Arc::new(IndexMap::new()),
        }
    }
}

impl<Id, T> IdentifiedVec<Id, T>
where
    Id: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(identity, value)` pairs, rejecting repeated identities.
    pub fn try_from_pairs(
        pairs: impl IntoIterator<Item = (Id, T)>,
    ) -> Result<Self, ReconcileError> {
        let mut items = IndexMap::new();
        for (id, item) in pairs {
            if items.contains_key(&id) {
                return Err(ReconcileError::IdentityCollision {
                    identity: format!("{:?}", id),
                });
            }
            items.insert(id, Arc::new(item));
        }
        Ok(Self {
            items: Arc::new(items),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &Id) -> Option<&T> {
        self.items.get(id).map(|item| &**item)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.items.contains_key(id)
    }

    /// Position of `id` in iteration order.
    pub fn index_of(&self, id: &Id) -> Option<usize> {
        self.items.get_index_of(id)
    }

    /// Append `item` under `id`. Returns false (and leaves the collection
    /// untouched) when the identity is already present.
    pub fn push(&mut self, id: Id, item: T) -> bool {
        if self.items.contains_key(&id) {
            return false;
        }
        Arc::make_mut(&mut self.items).insert(id, Arc::new(item));
        true
    }

    /// Store `item` under an existing identity, dropping the old value.
    /// Returns false for an absent identity.
    pub fn set(&mut self, id: &Id, item: T) -> bool {
        if !self.items.contains_key(id) {
            return false;
        }
        match Arc::make_mut(&mut self.items).get_mut(id) {
            Some(slot) => {
                *slot = Arc::new(item);
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.items.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values().map(|item| &**item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &T)> {
        self.items.iter().map(|(id, item)| (id, &**item))
    }

    /// Whether both collections share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<Id, T> IdentifiedVec<Id, T>
where
    Id: Eq + Hash + Clone + fmt::Debug,
    T: Clone,
{
    pub fn get_mut(&mut self, id: &Id) -> Option<&mut T> {
        if !self.items.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.items).get_mut(id).map(Arc::make_mut)
    }

    /// Replace the value stored under an existing identity. Absent
    /// identities are ignored and the value is handed back.
    pub fn replace(&mut self, id: &Id, item: T) -> Result<T, T> {
        if !self.items.contains_key(id) {
            return Err(item);
        }
        match Arc::make_mut(&mut self.items).get_mut(id) {
            Some(slot) => Ok(Arc::unwrap_or_clone(std::mem::replace(slot, Arc::new(item)))),
            None => Err(item),
        }
    }

    /// Remove an element, preserving the order of the remaining ones.
    pub fn remove(&mut self, id: &Id) -> Option<T> {
        if !self.items.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.items)
            .shift_remove(id)
            .map(Arc::unwrap_or_clone)
    }
}

impl<T> IdentifiedVec<T::Id, T>
where
    T: Identifiable,
{
    /// Build from values that know their own identity.
    pub fn try_from_items(items: impl IntoIterator<Item = T>) -> Result<Self, ReconcileError> {
        Self::try_from_pairs(items.into_iter().map(|item| (item.id(), item)))
    }

    /// Append an identifiable value. Returns false on a repeated identity.
    pub fn push_item(&mut self, item: T) -> bool {
        self.push(item.id(), item)
    }
}

// Order-sensitive, unlike `IndexMap`'s own equality.
impl<Id, T> PartialEq for IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.items, &other.items) {
            return true;
        }
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && (Arc::ptr_eq(a, b) || a == b))
    }
}

impl<Id, T> Eq for IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
    T: Eq,
{
}

impl<Id, T> fmt::Debug for IdentifiedVec<Id, T>
where
    Id: Eq + Hash + fmt::Debug,
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.items.iter().map(|(id, item)| (id, &**item)))
            .finish()
    }
}

// Serialized as a plain sequence of values; identities are recovered from the
// values themselves on the way back in.
impl<Id, T> Serialize for IdentifiedVec<Id, T>
where
    Id: Eq + Hash,
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values().map(|item| &**item))
    }
}

impl<'de, T> Deserialize<'de> for IdentifiedVec<T::Id, T>
where
    T: Identifiable + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from_items(items).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        label: String,
    }

    impl Identifiable for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn row(id: u32, label: &str) -> Row {
        Row {
            id,
            label: label.to_string(),
        }
    }

    #[test]
    fn preserves_insertion_order() {
        let rows = IdentifiedVec::try_from_items(vec![row(3, "c"), row(1, "a"), row(2, "b")])
            .expect("unique ids");
        let ids: Vec<u32> = rows.ids().copied().collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(rows.index_of(&1), Some(1));
    }

    #[test]
    fn rejects_identity_collision() {
        let result = IdentifiedVec::try_from_items(vec![row(1, "a"), row(1, "again")]);
        assert!(matches!(
            result,
            Err(ReconcileError::IdentityCollision { .. })
        ));
    }

    #[test]
    fn push_refuses_duplicates() {
        let mut rows = IdentifiedVec::new();
        assert!(rows.push_item(row(1, "a")));
        assert!(!rows.push_item(row(1, "b")));
        assert_eq!(rows.get(&1).map(|r| r.label.as_str()), Some("a"));
    }

    #[test]
    fn replace_ignores_missing_identity() {
        let mut rows = IdentifiedVec::try_from_items(vec![row(1, "a")]).expect("unique ids");
        assert!(rows.replace(&2, row(2, "b")).is_err());
        assert_eq!(rows.len(), 1);
        assert!(rows.replace(&1, row(1, "z")).is_ok());
        assert_eq!(rows.get(&1).map(|r| r.label.as_str()), Some("z"));
        assert!(!rows.set(&2, row(2, "b")));
        assert!(rows.set(&1, row(1, "y")));
        assert_eq!(rows.get(&1).map(|r| r.label.as_str()), Some("y"));
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut rows =
            IdentifiedVec::try_from_items(vec![row(1, "a"), row(2, "b"), row(3, "c")]).expect("ids");
        rows.remove(&2);
        let ids: Vec<u32> = rows.ids().copied().collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn clones_share_elements_until_written() {
        let rows = IdentifiedVec::try_from_items(vec![row(1, "a"), row(2, "b")]).expect("ids");
        let mut edited = rows.clone();
        assert!(edited.ptr_eq(&rows));

        if let Some(first) = edited.get_mut(&1) {
            first.label = "z".to_string();
        }
        assert!(!edited.ptr_eq(&rows));
        assert_eq!(rows.get(&1).map(|r| r.label.as_str()), Some("a"));
        assert_eq!(edited.get(&1).map(|r| r.label.as_str()), Some("z"));
        assert!(std::ptr::eq(
            rows.get(&2).expect("row 2"),
            edited.get(&2).expect("row 2")
        ));
        assert_ne!(rows, edited);
    }

    #[test]
    fn serializes_as_sequence() {
        let rows = IdentifiedVec::try_from_items(vec![row(1, "a"), row(2, "b")]).expect("ids");
        let json = serde_json::to_value(&rows).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([{"id": 1, "label": "a"}, {"id": 2, "label": "b"}])
        );
        let back: IdentifiedVec<u32, Row> = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, rows);
    }
}
