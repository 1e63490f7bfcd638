//! Identity-preserving reconciliation of child models.
//!
//! A [`ModelContainer`] maps the latest ordered collection of child states
//! onto child models. Models whose identity survives a reconciliation are
//! reused (and rebound to their new state); new identities get fresh models;
//! models for identities that disappeared are dropped and their cancellation
//! context is torn down.

mod membership;

pub use membership::Membership;

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

use crate::cancel::CancellationScope;
use crate::identified::IdentifiedVec;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Identity {identity} appears more than once in the new collection")]
    IdentityCollision { identity: String },
}

/// A child model that can be pointed at a newer version of its state.
pub trait Reconcilable: Send + Sync + 'static {
    type Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;
    type State;

    /// Called instead of re-creating the model when its identity persists.
    fn rebind(&self, state: Self::State);
}

/// What a reconciliation pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome<Id> {
    pub added: Vec<Id>,
    pub removed: Vec<Id>,
    pub retained: usize,
}

impl<Id> ReconcileOutcome<Id> {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ordered, identity-stable collection of child models.
pub struct ModelContainer<M: Reconcilable> {
    models: IndexMap<M::Id, M>,
    membership: Membership<M::Id>,
    scope: Option<CancellationScope<M::Id>>,
}

impl<M: Reconcilable> Default for ModelContainer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Reconcilable> ModelContainer<M> {
    pub fn new() -> Self {
        Self {
            models: IndexMap::new(),
            membership: Membership::new(),
            scope: None,
        }
    }

    /// Tie each child's cancellation context (keyed by its identity) to its
    /// membership in this container.
    pub fn with_scope(mut self, scope: CancellationScope<M::Id>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, id: &M::Id) -> Option<&M> {
        self.models.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &M::Id> {
        self.models.keys()
    }

    pub fn models(&self) -> impl Iterator<Item = &M> {
        self.models.values()
    }

    /// Shared view of the current identities, valid across reconciliations.
    pub fn membership(&self) -> Membership<M::Id> {
        self.membership.clone()
    }

    /// Reconcile against a new ordered collection of `(identity, state)`.
    ///
    /// Runs in O(n) using hash lookups. Repeated identities in `states` are
    /// rejected before anything is touched.
    pub fn reconcile<F>(
        &mut self,
        states: impl IntoIterator<Item = (M::Id, M::State)>,
        mut create: F,
    ) -> Result<ReconcileOutcome<M::Id>, ReconcileError>
    where
        F: FnMut(&M::Id, M::State) -> M,
    {
        let states: Vec<(M::Id, M::State)> = states.into_iter().collect();
        let mut seen = HashSet::with_capacity(states.len());
        for (id, _) in &states {
            if !seen.insert(id) {
                return Err(ReconcileError::IdentityCollision {
                    identity: format!("{:?}", id),
                });
            }
        }

        let mut previous = std::mem::take(&mut self.models);
        let mut next = IndexMap::with_capacity(states.len());
        let mut added = Vec::new();

        for (id, state) in states {
            let model = match previous.swap_remove(&id) {
                Some(existing) => {
                    existing.rebind(state);
                    existing
                }
                None => {
                    if let Some(scope) = &self.scope {
                        scope.recreate(&id);
                    }
                    added.push(id.clone());
                    create(&id, state)
                }
            };
            next.insert(id, model);
        }

        let removed: Vec<M::Id> = previous.into_keys().collect();
        if let Some(scope) = &self.scope {
            for id in &removed {
                scope.cancel_all(id);
            }
        }

        let retained = next.len() - added.len();
        self.models = next;
        self.membership.replace(self.models.keys().cloned());

        tracing::debug!(
            added = added.len(),
            removed = removed.len(),
            retained,
            "Reconciled child models"
        );

        Ok(ReconcileOutcome {
            added,
            removed,
            retained,
        })
    }

    /// Reconcile against an identified collection of states.
    pub fn reconcile_identified<F>(
        &mut self,
        states: &IdentifiedVec<M::Id, M::State>,
        create: F,
    ) -> Result<ReconcileOutcome<M::Id>, ReconcileError>
    where
        M::State: Clone,
        F: FnMut(&M::Id, M::State) -> M,
    {
        self.reconcile(
            states.iter().map(|(id, state)| (id.clone(), state.clone())),
            create,
        )
    }
}
