//! The single owner of a state tree.
//!
//! A [`Store`] serializes every write, records each resulting state in a
//! [`HistoryLog`], and notifies path subscribers with the values they
//! observe. Observers normally see the latest state; a time-travel override
//! can pin what they see to a historical entry while writes keep recording:
//!
//! ```text
//! apply ──→ write head ──→ history [0, 1, 2, ... n]
//!                                      │
//!                   observed index ────┘ (live: n, override: i)
//!                          │
//!                          └──→ subscriptions
//! ```

mod changes;
mod history;
mod subscription;

pub use changes::ChangedPaths;
pub use history::{HistoryLog, HistoryPolicy};
pub use subscription::Subscription;

use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::path::{PathKey, PathView};
use crate::remote::{Override, OverrideState, RemoteError};
use subscription::{Observer, PathObserver};

/// Thread-safe state container with serialized writes.
///
/// Cheap to clone; clones share the same state.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<S> {
    core: RwLock<StoreCore<S>>,
    overrides: watch::Sender<OverrideState>,
}

struct StoreCore<S> {
    /// Latest written state.
    head: Arc<S>,
    /// State subscribers currently see.
    observed: Arc<S>,
    history: HistoryLog<S>,
    /// Pinned history index, `None` while live.
    pinned: Option<u64>,
    observers: Vec<Box<dyn Observer<S>>>,
}

impl<S> StoreCore<S> {
    fn override_state(&self) -> OverrideState {
        OverrideState {
            count: self.history.count(),
            index: self.pinned,
        }
    }

    fn out_of_range(&self, index: u64) -> RemoteError {
        RemoteError::HistoryIndexOutOfRange {
            index,
            first: self.history.first_index(),
            count: self.history.count(),
        }
    }

    fn deliver(&mut self) {
        let observed = Arc::clone(&self.observed);
        self.observers.retain_mut(|observer| observer.deliver(&observed));
    }
}

impl<S> Store<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a store with unbounded history.
    pub fn new(initial: S) -> Self {
        Self::with_history(initial, HistoryPolicy::default())
    }

    pub fn with_history(initial: S, policy: HistoryPolicy) -> Self {
        let initial = Arc::new(initial);
        let core = StoreCore {
            head: Arc::clone(&initial),
            observed: Arc::clone(&initial),
            history: HistoryLog::new(initial, policy),
            pinned: None,
            observers: Vec::new(),
        };
        let (overrides, _) = watch::channel(core.override_state());
        Self {
            inner: Arc::new(StoreInner {
                core: RwLock::new(core),
                overrides,
            }),
        }
    }

    /// Snapshot of the latest written state.
    pub fn current_state(&self) -> Arc<S> {
        Arc::clone(&self.inner.core.read().head)
    }

    /// Snapshot of the state subscribers currently observe. Differs from
    /// [`Store::current_state`] only while a time-travel override is set.
    pub fn observed_state(&self) -> Arc<S> {
        Arc::clone(&self.inner.core.read().observed)
    }

    /// Read a path from the observed state.
    pub fn read<V: 'static>(&self, path: &PathView<S, V>) -> Option<V> {
        path.read(&self.inner.core.read().observed)
    }

    /// Apply a mutation atomically and return the paths it changed.
    ///
    /// Writes are serialized; readers never see a partial mutation. The
    /// mutation runs under the write lock and must not call back into the
    /// store. A mutation that leaves the state equal to the previous one
    /// records nothing and returns an empty set.
    ///
    /// The mutation receives a clone of the current state and the result is
    /// compared with it, so both cost what cloning and comparing `S` costs.
    /// Hold large subtrees in an [`IdentifiedVec`](crate::identified::IdentifiedVec)
    /// or an `Arc` to keep that proportional to the part that changed.
    pub fn apply<F>(&self, mutation: F) -> ChangedPaths
    where
        F: FnOnce(S) -> S,
    {
        self.commit(|previous| {
            let next = mutation(S::clone(previous));
            (next != *previous).then_some((next, None))
        })
    }

    /// Apply an in-place mutation.
    pub fn apply_mut<F>(&self, mutation: F) -> ChangedPaths
    where
        F: FnOnce(&mut S),
    {
        self.apply(|mut state| {
            mutation(&mut state);
            state
        })
    }

    /// Write `value` through `path`. A no-op when the path does not resolve.
    ///
    /// Only the value at `path` is compared to decide whether anything
    /// changed.
    pub fn write<V>(&self, path: &PathView<S, V>, value: V) -> ChangedPaths
    where
        V: PartialEq + 'static,
    {
        self.commit(|previous| {
            let before = path.read(previous);
            if before.as_ref() == Some(&value) {
                return None;
            }
            let next = path.write(S::clone(previous), value);
            (path.read(&next) != before).then(|| (next, Some(path.key().clone())))
        })
    }

    /// Modify the value at `path` in place. A no-op when the path does not
    /// resolve.
    pub fn modify<V>(&self, path: &PathView<S, V>, f: impl FnOnce(&mut V)) -> ChangedPaths
    where
        V: Clone + PartialEq + 'static,
    {
        self.commit(|previous| {
            let before = path.read(previous)?;
            let mut after = before.clone();
            f(&mut after);
            if after == before {
                return None;
            }
            Some((path.write(S::clone(previous), after), Some(path.key().clone())))
        })
    }

    /// Run `produce` against the write head under the write lock and record
    /// what it returns. `produce` yields `None` when nothing changed, else
    /// the next state and the key it wrote, if path-scoped.
    fn commit<F>(&self, produce: F) -> ChangedPaths
    where
        F: FnOnce(&S) -> Option<(S, Option<PathKey>)>,
    {
        let mut guard = self.inner.core.write();
        let core = &mut *guard;
        let previous = Arc::clone(&core.head);
        let Some((next, written)) = produce(&previous) else {
            return ChangedPaths::none();
        };
        let next = Arc::new(next);

        let mut changed = ChangedPaths::none();
        changed.record(PathKey::root(), true);
        if let Some(key) = written {
            changed.record(key, true);
        }
        for observer in &core.observers {
            let key = observer.key();
            if !changed.contains(key) {
                changed.record(key.clone(), observer.differs(&previous, &next));
            }
        }

        core.head = Arc::clone(&next);
        let index = core.history.append(Arc::clone(&next));

        match core.pinned {
            None => core.observed = next,
            Some(pinned) if pinned < core.history.first_index() => {
                // The pinned entry was evicted; hold the oldest retained one.
                let first = core.history.first_index();
                if let Some(entry) = core.history.get(first) {
                    core.observed = Arc::clone(entry);
                }
                core.pinned = Some(first);
            }
            Some(_) => {}
        }
        core.deliver();

        let published = core.override_state();
        drop(guard);
        self.inner.overrides.send_replace(published);

        tracing::trace!(
            index,
            changed = changed.len(),
            "Applied store mutation"
        );
        changed
    }

    /// Subscribe to the values observed at `path`.
    pub fn subscribe<V>(&self, path: PathView<S, V>) -> Subscription<V>
    where
        V: Clone + PartialEq + Send + Sync + 'static,
    {
        let mut core = self.inner.core.write();
        let (observer, subscription) = PathObserver::open(path, &core.observed);
        core.observers.push(Box::new(observer));
        subscription
    }

    // ─── Time travel ─────────────────────────────────────────

    /// Current replay position and history length.
    pub fn override_state(&self) -> OverrideState {
        self.inner.core.read().override_state()
    }

    /// Receive every [`OverrideState`] publication, starting with the
    /// current one.
    pub fn override_states(&self) -> watch::Receiver<OverrideState> {
        self.inner.overrides.subscribe()
    }

    pub fn history_count(&self) -> u64 {
        self.inner.core.read().history.count()
    }

    /// Absolute indices still retained.
    pub fn history_range(&self) -> Range<u64> {
        let core = self.inner.core.read();
        core.history.first_index()..core.history.count()
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        self.inner.core.read().history.policy()
    }

    /// Recorded state at absolute `index`, if still retained.
    pub fn history_entry(&self, index: u64) -> Option<Arc<S>> {
        self.inner.core.read().history.get(index).cloned()
    }

    /// Entry `index` with the state it should be diffed against.
    pub fn history_pair(&self, index: u64) -> Result<(Arc<S>, Arc<S>), RemoteError> {
        let core = self.inner.core.read();
        match (core.history.predecessor(index), core.history.get(index)) {
            (Some(before), Some(after)) => Ok((Arc::clone(before), Arc::clone(after))),
            _ => Err(core.out_of_range(index)),
        }
    }

    /// Change what observers see. Recording is unaffected.
    ///
    /// Out-of-range requests leave the override untouched.
    pub fn set_override(&self, request: Override) -> Result<OverrideState, RemoteError> {
        let mut guard = self.inner.core.write();
        let core = &mut *guard;
        match request {
            Override::Live => {
                core.pinned = None;
                core.observed = Arc::clone(&core.head);
            }
            Override::PauseAtLatest => {
                let Some(latest) = core.history.latest_index() else {
                    return Err(core.out_of_range(OverrideState::PAUSE_AT_LATEST));
                };
                core.pinned = Some(latest);
                core.observed = Arc::clone(&core.head);
            }
            Override::Index(index) => {
                let Some(entry) = core.history.get(index).cloned() else {
                    return Err(core.out_of_range(index));
                };
                core.pinned = Some(index);
                core.observed = entry;
            }
        }
        core.deliver();

        let published = core.override_state();
        drop(guard);
        self.inner.overrides.send_replace(published);
        tracing::debug!(request = ?request, index = ?published.index, "Observed index changed");
        Ok(published)
    }
}
