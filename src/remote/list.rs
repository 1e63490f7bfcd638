use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cancel::CancellationScope;
use crate::reconcile::{ModelContainer, Reconcilable, ReconcileError, ReconcileOutcome};

use super::discovery::{RemoteBrowser, RemoteMap};
use super::types::{Override, OverrideState, RemoteIdentifier};
use super::RemoteHandle;

/// Controller-side model of one remote store.
///
/// Follows the remote's [`OverrideState`] stream under a cancellation context
/// keyed by its identifier, so removing the remote from the list stops the
/// subscription. Clones share the same model.
#[derive(Clone)]
pub struct RemoteModel {
    inner: Arc<RemoteModelInner>,
}

struct RemoteModelInner {
    id: RemoteIdentifier,
    handle: Mutex<Arc<dyn RemoteHandle>>,
    state: Arc<watch::Sender<Option<OverrideState>>>,
    scope: CancellationScope<RemoteIdentifier>,
}

impl RemoteModel {
    fn start(
        id: RemoteIdentifier,
        handle: Arc<dyn RemoteHandle>,
        scope: CancellationScope<RemoteIdentifier>,
    ) -> Self {
        let (state, _) = watch::channel(None);
        let model = Self {
            inner: Arc::new(RemoteModelInner {
                id,
                handle: Mutex::new(Arc::clone(&handle)),
                state: Arc::new(state),
                scope,
            }),
        };
        model.follow(handle.as_ref());
        model
    }

    fn follow(&self, handle: &dyn RemoteHandle) {
        let state = Arc::clone(&self.inner.state);
        let stream = handle.state_stream();
        let started = self
            .inner
            .scope
            .with_context(self.inner.id.clone(), |context| {
                context.for_each(stream, move |next| {
                    state.send_replace(Some(next));
                })
            })
            .and_then(|registered| registered);
        if let Err(err) = started {
            tracing::warn!(
                remote = %self.inner.id.display_name(),
                error = %err,
                "Failed to follow remote override state"
            );
        }
    }

    pub fn id(&self) -> &RemoteIdentifier {
        &self.inner.id
    }

    pub fn display_name(&self) -> String {
        self.inner.id.display_name()
    }

    /// Latest state published by the remote, `None` until the first one
    /// arrives.
    pub fn override_state(&self) -> Option<OverrideState> {
        *self.inner.state.borrow()
    }

    pub fn override_states(&self) -> watch::Receiver<Option<OverrideState>> {
        self.inner.state.subscribe()
    }

    pub fn set_override(&self, request: Override) {
        self.handle().set_override(request);
    }

    pub fn resume(&self) {
        self.set_override(Override::Live);
    }

    pub fn pause(&self) {
        self.set_override(Override::PauseAtLatest);
    }

    pub fn select(&self, index: u64) {
        self.set_override(Override::Index(index));
    }

    pub fn print_diff(&self, index: u64) {
        self.handle().print_diff(index);
    }

    /// Whether two models are the same instance, not merely the same remote.
    pub fn same_instance(&self, other: &RemoteModel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn handle(&self) -> Arc<dyn RemoteHandle> {
        Arc::clone(&self.inner.handle.lock())
    }
}

impl Reconcilable for RemoteModel {
    type Id = RemoteIdentifier;
    type State = Arc<dyn RemoteHandle>;

    /// Adopt a fresh handle for the same remote. The state subscription is
    /// restarted only when the handle actually changed.
    fn rebind(&self, handle: Arc<dyn RemoteHandle>) {
        {
            let mut current = self.inner.handle.lock();
            if Arc::ptr_eq(&*current, &handle) {
                return;
            }
            *current = Arc::clone(&handle);
        }
        self.inner.scope.cancel_all(&self.inner.id);
        self.inner.scope.recreate(&self.inner.id);
        self.follow(handle.as_ref());
    }
}

/// Every reachable remote store, reconciled from browse snapshots.
///
/// Models keep their identity across snapshots: a remote present in two
/// consecutive snapshots is the same [`RemoteModel`] instance.
pub struct RemoteList {
    container: Mutex<ModelContainer<RemoteModel>>,
    scope: CancellationScope<RemoteIdentifier>,
}

impl Default for RemoteList {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteList {
    pub fn new() -> Self {
        let scope = CancellationScope::new();
        Self {
            container: Mutex::new(ModelContainer::new().with_scope(scope.clone())),
            scope,
        }
    }

    /// Reconcile against one snapshot. Models are ordered by identifier.
    pub fn apply_snapshot(
        &self,
        remotes: RemoteMap,
    ) -> Result<ReconcileOutcome<RemoteIdentifier>, ReconcileError> {
        let mut entries: Vec<_> = remotes.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let scope = self.scope.clone();
        self.container.lock().reconcile(entries, |id, handle| {
            RemoteModel::start(id.clone(), handle, scope.clone())
        })
    }

    pub fn remotes(&self) -> Vec<RemoteModel> {
        self.container.lock().models().cloned().collect()
    }

    pub fn get(&self, id: &RemoteIdentifier) -> Option<RemoteModel> {
        self.container.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.container.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.lock().is_empty()
    }

    /// Drop every model and stop their subscriptions.
    pub fn clear(&self) {
        if let Err(err) = self.apply_snapshot(RemoteMap::new()) {
            tracing::warn!(error = %err, "Failed to clear remote list");
        }
    }

    /// Follow `browser` until its stream ends or the returned task is
    /// aborted.
    pub fn watch(self: &Arc<Self>, browser: &dyn RemoteBrowser) -> JoinHandle<()> {
        let list = Arc::clone(self);
        let mut snapshots = browser.browse();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                if let Err(err) = list.apply_snapshot(snapshot) {
                    tracing::warn!(error = %err, "Remote snapshot rejected");
                }
            }
            tracing::debug!("Remote browse stream ended");
        })
    }
}
