//! Cancellation contexts keyed by arbitrary identities.
//!
//! Every asynchronous subscription a model starts is registered under a
//! context id. Cancelling the id tears down every task under it (and under
//! any nested ids) at once:
//!
//! ```text
//! Unregistered ──register──→ Active ──cancel_all──→ Cancelled
//!       ↑                                              │
//!       └────────────────── recreate ──────────────────┘
//! ```
//!
//! Registering under a cancelled id fails with
//! [`CancelError::ContextAlreadyCancelled`] until the id is recreated.
//! Cancelling twice is a no-op.

mod token;

pub use token::CancellationToken;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures_core::Stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("Cancellation context '{context}' was already cancelled")]
    ContextAlreadyCancelled { context: String },
}

/// Lifecycle of a single context id.
///
/// A context opened with [`CancellationScope::context`] reports
/// `Unregistered` until the first task handle is registered under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unregistered,
    /// At least one task handle is registered.
    Active,
    Cancelled,
}

struct ActiveContext<K> {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    children: Vec<K>,
}

enum Entry<K> {
    Active(ActiveContext<K>),
    Cancelled,
}

/// Registry of cancellation contexts.
///
/// A cancelled id is kept as a tombstone so that late registrations under it
/// fail instead of starting tasks nobody will cancel. Tombstones live until
/// the id is recreated or [`CancellationScope::forget_cancelled`] drops them,
/// so a scope keyed by ever-new ids grows by one small entry per cancelled id.
///
/// Cheap to clone; clones share the same registry.
pub struct CancellationScope<K> {
    contexts: Arc<Mutex<HashMap<K, Entry<K>>>>,
}

impl<K> Clone for CancellationScope<K> {
    fn clone(&self) -> Self {
        Self {
            contexts: Arc::clone(&self.contexts),
        }
    }
}

impl<K> Default for CancellationScope<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> CancellationScope<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn state(&self, id: &K) -> ContextState {
        match self.contexts.lock().get(id) {
            Some(Entry::Active(context)) if !context.handles.is_empty() => ContextState::Active,
            None | Some(Entry::Active(_)) => ContextState::Unregistered,
            Some(Entry::Cancelled) => ContextState::Cancelled,
        }
    }

    /// Number of contexts with at least one registered task.
    pub fn active_count(&self) -> usize {
        self.contexts
            .lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Active(context) if !context.handles.is_empty()))
            .count()
    }

    /// Number of cancelled ids still held as tombstones.
    pub fn cancelled_count(&self) -> usize {
        self.contexts
            .lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Cancelled))
            .count()
    }

    /// Drop every tombstone. Afterwards a cancelled id behaves as if it had
    /// never been registered. Returns the number of ids forgotten.
    pub fn forget_cancelled(&self) -> usize {
        let mut contexts = self.contexts.lock();
        let before = contexts.len();
        contexts.retain(|_, entry| matches!(entry, Entry::Active(_)));
        before - contexts.len()
    }

    /// Open (or rejoin) the context for `id`.
    pub fn context(&self, id: K) -> Result<ContextHandle<K>, CancelError> {
        let mut contexts = self.contexts.lock();
        let token = activate(&mut contexts, &id)?;
        Ok(ContextHandle {
            scope: self.clone(),
            id,
            token,
        })
    }

    /// Run `f` with the context for `id`; every task it starts through the
    /// handle is owned by that context.
    pub fn with_context<R>(
        &self,
        id: K,
        f: impl FnOnce(&ContextHandle<K>) -> R,
    ) -> Result<R, CancelError> {
        let handle = self.context(id)?;
        Ok(f(&handle))
    }

    /// Open `child` as a context nested under `parent`; cancelling the parent
    /// cancels the child too.
    pub fn nest(&self, parent: &K, child: K) -> Result<ContextHandle<K>, CancelError> {
        let mut contexts = self.contexts.lock();
        activate(&mut contexts, parent)?;
        let token = activate(&mut contexts, &child)?;
        if let Some(Entry::Active(context)) = contexts.get_mut(parent) {
            if !context.children.contains(&child) {
                context.children.push(child.clone());
            }
        }
        Ok(ContextHandle {
            scope: self.clone(),
            id: child,
            token,
        })
    }

    /// Cancel every task registered under `id` and its nested contexts.
    ///
    /// Returns the number of task handles torn down. Cancelling an id that is
    /// unregistered or already cancelled does nothing.
    pub fn cancel_all(&self, id: &K) -> usize {
        let mut contexts = self.contexts.lock();
        let mut pending = vec![id.clone()];
        let mut aborted = 0;

        while let Some(next) = pending.pop() {
            let Some(entry) = contexts.get_mut(&next) else {
                continue;
            };
            let Entry::Active(context) = std::mem::replace(entry, Entry::Cancelled) else {
                continue;
            };
            context.token.cancel();
            for handle in &context.handles {
                if !handle.is_finished() {
                    aborted += 1;
                }
                handle.abort();
            }
            tracing::debug!(
                context = ?next,
                handles = context.handles.len(),
                nested = context.children.len(),
                "Cancelled context"
            );
            pending.extend(context.children);
        }

        aborted
    }

    /// Forget a cancelled context so the id can be registered again.
    pub fn recreate(&self, id: &K) {
        let mut contexts = self.contexts.lock();
        if matches!(contexts.get(id), Some(Entry::Cancelled)) {
            contexts.remove(id);
        }
    }

    fn register(&self, id: &K, handle: JoinHandle<()>) -> Result<(), CancelError> {
        let mut contexts = self.contexts.lock();
        match contexts.get_mut(id) {
            Some(Entry::Active(context)) => {
                context.handles.retain(|handle| !handle.is_finished());
                context.handles.push(handle);
                Ok(())
            }
            _ => {
                handle.abort();
                Err(already_cancelled(id))
            }
        }
    }
}

fn activate<K>(
    contexts: &mut HashMap<K, Entry<K>>,
    id: &K,
) -> Result<CancellationToken, CancelError>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    let entry = contexts.entry(id.clone()).or_insert_with(|| {
        Entry::Active(ActiveContext {
            token: CancellationToken::new(),
            handles: Vec::new(),
            children: Vec::new(),
        })
    });
    match entry {
        Entry::Active(context) => Ok(context.token.clone()),
        Entry::Cancelled => Err(already_cancelled(id)),
    }
}

fn already_cancelled<K: fmt::Debug>(id: &K) -> CancelError {
    CancelError::ContextAlreadyCancelled {
        context: format!("{:?}", id),
    }
}

/// A live registration under one context id.
pub struct ContextHandle<K> {
    scope: CancellationScope<K>,
    id: K,
    token: CancellationToken,
}

impl<K> ContextHandle<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `task` under this context. The task is dropped at its next
    /// suspension point once the context is cancelled.
    pub fn spawn<F>(&self, task: F) -> Result<(), CancelError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.token.is_cancelled() {
            return Err(already_cancelled(&self.id));
        }
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = task => {}
            }
        });
        self.scope.register(&self.id, handle)
    }

    /// Consume `stream` in a task owned by this context, calling `f` for each
    /// element. After cancellation no further element reaches `f`; anything
    /// the source still produces is dropped with the stream.
    pub fn for_each<S, F>(&self, stream: S, mut f: F) -> Result<(), CancelError>
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) + Send + 'static,
    {
        let token = self.token.clone();
        self.spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                if token.is_cancelled() {
                    break;
                }
                f(item);
            }
        })
    }

    /// Like [`ContextHandle::for_each`], awaiting `f`'s future before pulling
    /// the next element.
    pub fn for_each_async<S, F, Fut>(&self, stream: S, mut f: F) -> Result<(), CancelError>
    where
        S: Stream + Send + 'static,
        S::Item: Send,
        F: FnMut(S::Item) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = self.token.clone();
        self.spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                if token.is_cancelled() {
                    break;
                }
                f(item).await;
            }
        })
    }
}
