//! Type-erased keys identifying a projection inside a root state.
//!
//! A [`PathKey`] is the sequence of segments a [`PathView`](super::PathView)
//! walks. Keys are used to route change notifications and to report which
//! paths an `apply` touched, so they need `Eq + Hash` without knowing the
//! concrete identity types stored in element segments.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

trait DynIdentity: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynIdentity) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> DynIdentity for T
where
    T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynIdentity) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An identity value with its concrete type erased.
///
/// Two erased identities are equal only when they hold the same concrete
/// type and the values compare equal.
#[derive(Clone)]
pub struct ErasedIdentity(Arc<dyn DynIdentity>);

impl ErasedIdentity {
    pub fn new<T>(identity: T) -> Self
    where
        T: Eq + Hash + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(identity))
    }

    /// Recover the concrete identity, if it has type `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for ErasedIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}

impl Eq for ErasedIdentity {}

impl Hash for ErasedIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state);
    }
}

impl fmt::Debug for ErasedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.dyn_fmt(f)
    }
}

/// One step of a projection path.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Struct field projection.
    Field(&'static str),
    /// Enum case projection. Compares by case name only, never by payload,
    /// so every projection into the same case routes to the same key.
    Case(&'static str),
    /// Identity-indexed collection element.
    Element(ErasedIdentity),
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => write!(f, ".{}", name),
            Segment::Case(name) => write!(f, "/{}", name),
            Segment::Element(id) => write!(f, "[{:?}]", id),
        }
    }
}

/// The full segment chain of a projection. The empty key is the root.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PathKey {
    segments: Arc<[Segment]>,
}

impl PathKey {
    pub fn root() -> Self {
        Self::default()
    }

    pub(crate) fn single(segment: Segment) -> Self {
        Self {
            segments: Arc::from(vec![segment]),
        }
    }

    pub(crate) fn join(&self, other: &PathKey) -> PathKey {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(other.segments.iter().cloned());
        PathKey {
            segments: Arc::from(segments),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` is an ancestor of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &PathKey) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(other.segments.iter()).all(|(a, b)| a == b)
    }

    /// True when one key lies on the other's path.
    pub fn overlaps(&self, other: &PathKey) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for segment in self.segments.iter() {
            write!(f, "{:?}", segment)?;
        }
        Ok(())
    }
}
