//! Composable write-access paths into a state tree.
//!
//! A [`PathView<Root, Value>`] knows how to read a `Value` out of a `Root`
//! and how to produce a new `Root` with that `Value` replaced. Views are
//! built from three primitive projections and composed with
//! [`PathView::then`]:
//!
//! ```text
//! field      .count            always resolves
//! case       /Some, /Detail    resolves iff the stored variant matches
//! element    [id]              resolves iff the identity is present
//! ```
//!
//! Reads never fail: a projection that cannot resolve yields `None`.
//! Writes through an unresolvable projection return the root unchanged,
//! unless the case projection carries a clear value to start from.

mod key;

pub use key::{ErasedIdentity, PathKey, Segment};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::identified::IdentifiedVec;

type Getter<R, V> = Arc<dyn Fn(&R) -> Option<V> + Send + Sync>;
type Setter<R, V> = Arc<dyn Fn(R, V) -> R + Send + Sync>;
type ClearValue<V> = Arc<dyn Fn() -> V + Send + Sync>;

/// Type-erased accessor for a sub-value of `Root`.
pub struct PathView<Root, Value> {
    key: PathKey,
    get: Getter<Root, Value>,
    set: Setter<Root, Value>,
    clear: Option<ClearValue<Value>>,
}

impl<Root, Value> Clone for PathView<Root, Value> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
            clear: self.clear.clone(),
        }
    }
}

impl<Root: Clone + 'static> PathView<Root, Root> {
    /// The identity projection; unit of [`PathView::then`].
    pub fn identity() -> Self {
        Self {
            key: PathKey::root(),
            get: Arc::new(|root: &Root| Some(root.clone())),
            set: Arc::new(|_root: Root, value: Root| value),
            clear: None,
        }
    }
}

impl<Root: 'static, Value: 'static> PathView<Root, Value> {
    /// Project a struct field.
    pub fn field<G, S>(name: &'static str, get: G, set: S) -> Self
    where
        Value: Clone,
        G: Fn(&Root) -> &Value + Send + Sync + 'static,
        S: Fn(&mut Root, Value) + Send + Sync + 'static,
    {
        Self {
            key: PathKey::single(Segment::Field(name)),
            get: Arc::new(move |root: &Root| Some(get(root).clone())),
            set: Arc::new(move |mut root: Root, value: Value| {
                set(&mut root, value);
                root
            }),
            clear: None,
        }
    }

    /// Project an enum case.
    ///
    /// `extract` returns the payload iff the stored variant is `name`;
    /// `embed` builds the whole enum value from a payload, so writing through
    /// a case projection replaces whatever variant was stored.
    pub fn case<E, M>(name: &'static str, extract: E, embed: M) -> Self
    where
        E: Fn(&Root) -> Option<Value> + Send + Sync + 'static,
        M: Fn(Value) -> Root + Send + Sync + 'static,
    {
        Self {
            key: PathKey::single(Segment::Case(name)),
            get: Arc::new(extract),
            set: Arc::new(move |_root: Root, value: Value| embed(value)),
            clear: None,
        }
    }

    /// Value to start from when a deeper write goes through this projection
    /// while it does not resolve.
    pub fn with_clear_value(mut self, value: Value) -> Self
    where
        Value: Clone + Send + Sync,
    {
        self.clear = Some(Arc::new(move || value.clone()));
        self
    }

    pub fn key(&self) -> &PathKey {
        &self.key
    }

    /// Read the projected value; `None` when the path does not resolve.
    pub fn read(&self, root: &Root) -> Option<Value> {
        (self.get)(root)
    }

    /// Write `value` into `root`.
    pub fn write(&self, root: Root, value: Value) -> Root {
        (self.set)(root, value)
    }

    /// Read, mutate and write back in one step. A no-op on a miss.
    pub fn modify<F>(&self, root: Root, f: F) -> Root
    where
        F: FnOnce(&mut Value),
    {
        match self.read(&root) {
            Some(mut value) => {
                f(&mut value);
                self.write(root, value)
            }
            None => root,
        }
    }

    /// Compose with a projection rooted at this view's value.
    pub fn then<Leaf: 'static>(&self, next: &PathView<Value, Leaf>) -> PathView<Root, Leaf> {
        let outer_get = Arc::clone(&self.get);
        let inner_get = Arc::clone(&next.get);
        let get: Getter<Root, Leaf> =
            Arc::new(move |root: &Root| outer_get(root).and_then(|mid| inner_get(&mid)));

        let outer_get = Arc::clone(&self.get);
        let outer_set = Arc::clone(&self.set);
        let outer_clear = self.clear.clone();
        let inner_set = Arc::clone(&next.set);
        let set: Setter<Root, Leaf> = Arc::new(move |root: Root, leaf: Leaf| {
            let mid = outer_get(&root).or_else(|| outer_clear.as_ref().map(|clear| clear()));
            match mid {
                Some(mid) => outer_set(root, inner_set(mid, leaf)),
                None => root,
            }
        });

        PathView {
            key: self.key.join(&next.key),
            get,
            set,
            clear: next.clear.clone(),
        }
    }
}

impl<T: Clone + 'static> PathView<Option<T>, T> {
    /// The `Some` case of an `Option`.
    pub fn some() -> Self {
        PathView::case("Some", |option: &Option<T>| option.clone(), Some)
    }
}

impl<Id, T> PathView<IdentifiedVec<Id, T>, T>
where
    Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    T: Clone + 'static,
{
    /// The element stored under `id`. Writing when no element has that
    /// identity leaves the collection unchanged.
    pub fn element(id: Id) -> Self {
        let get_id = id.clone();
        let set_id = id.clone();
        Self {
            key: PathKey::single(Segment::Element(ErasedIdentity::new(id))),
            get: Arc::new(move |items: &IdentifiedVec<Id, T>| items.get(&get_id).cloned()),
            set: Arc::new(move |mut items: IdentifiedVec<Id, T>, value: T| {
                items.set(&set_id, value);
                items
            }),
            clear: None,
        }
    }
}

// Views compare and hash by key only. Case segments ignore payloads, so any
// two projections into the same case are interchangeable routing keys.
impl<Root, Value> PartialEq for PathView<Root, Value> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<Root, Value> Eq for PathView<Root, Value> {}

impl<Root, Value> Hash for PathView<Root, Value> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<Root, Value> fmt::Debug for PathView<Root, Value> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathView").field(&self.key).finish()
    }
}
