use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cancel::CancellationScope;
use crate::events::{EventRouter, EventSender};
use crate::mvi::Reducer;
use crate::path::PathView;
use crate::reconcile::{ModelContainer, Reconcilable};
use crate::store::{ChangedPaths, Store, Subscription};

use super::fact::FactClient;
use super::intent::{CounterEvent, CounterIntent, CountersIntent};
use super::reducer::{CounterReducer, CountersReducer};
use super::state::{CounterState, CountersState, FactPrompt};

/// Apply `intent` to the counter at `path`. A no-op once that counter is
/// gone.
fn reduce_counter(
    store: &Store<CountersState>,
    path: &PathView<CountersState, CounterState>,
    intent: CounterIntent,
) -> ChangedPaths {
    store.modify(path, |counter| {
        *counter = CounterReducer::reduce(counter.clone(), intent);
    })
}

/// Child model for one counter.
///
/// Reads and writes go through the store by identity, so the model stays
/// valid while the counter moves within the list. Clones share the model.
#[derive(Clone)]
pub struct CounterModel {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    id: Uuid,
    store: Store<CountersState>,
    path: PathView<CountersState, CounterState>,
    /// State as of the last reconciliation.
    snapshot: Mutex<CounterState>,
    events: EventSender<Uuid, CounterEvent>,
}

impl CounterModel {
    fn new(
        store: Store<CountersState>,
        state: CounterState,
        events: EventSender<Uuid, CounterEvent>,
    ) -> Self {
        let id = state.id;
        Self {
            inner: Arc::new(CounterInner {
                id,
                store,
                path: CountersState::counter_path(id),
                snapshot: Mutex::new(state),
                events,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Current observed state, or the last reconciled one after removal.
    pub fn state(&self) -> CounterState {
        self.inner
            .store
            .read(&self.inner.path)
            .unwrap_or_else(|| self.inner.snapshot.lock().clone())
    }

    pub fn count(&self) -> i64 {
        self.state().count
    }

    pub fn fact_prompt(&self) -> Option<FactPrompt> {
        self.state().fact_prompt
    }

    pub fn send(&self, intent: CounterIntent) -> ChangedPaths {
        if intent == CounterIntent::FactButtonTapped {
            if let Some(count) = self.inner.store.read(&self.count_path()) {
                self.inner.events.emit(CounterEvent::FactRequested(count));
            }
        }
        reduce_counter(&self.inner.store, &self.inner.path, intent)
    }

    pub fn count_path(&self) -> PathView<CountersState, i64> {
        self.inner.path.then(&CounterState::count_path())
    }

    pub fn prompt_path(&self) -> PathView<CountersState, FactPrompt> {
        self.inner.path.then(&CounterState::prompt_path())
    }

    pub fn counts(&self) -> Subscription<i64> {
        self.inner.store.subscribe(self.count_path())
    }

    /// Prompts as they appear. Dismissals are not reported.
    pub fn prompts(&self) -> Subscription<FactPrompt> {
        self.inner.store.subscribe(self.prompt_path())
    }

    pub fn same_instance(&self, other: &CounterModel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Reconcilable for CounterModel {
    type Id = Uuid;
    type State = CounterState;

    fn rebind(&self, state: CounterState) {
        *self.inner.snapshot.lock() = state;
    }
}

/// Parent model owning the counter list.
///
/// Keeps one [`CounterModel`] per counter, reconciled on every observed
/// change of the list, and performs the fact effect for its children.
/// Effects run under a cancellation context keyed by the counter's identity,
/// so removing a counter cancels its in-flight fetch.
///
/// Must be created inside a tokio runtime.
pub struct CountersModel {
    inner: Arc<CountersInner>,
    tasks: Vec<JoinHandle<()>>,
}

struct CountersInner {
    store: Store<CountersState>,
    children: Mutex<ModelContainer<CounterModel>>,
    router: EventRouter<Uuid, CounterEvent>,
    scope: CancellationScope<Uuid>,
    facts: Arc<dyn FactClient>,
}

impl CountersModel {
    pub fn new(store: Store<CountersState>, facts: Arc<dyn FactClient>) -> Self {
        let scope = CancellationScope::new();
        let children = ModelContainer::new().with_scope(scope.clone());
        let router = EventRouter::new(children.membership());
        let inner = Arc::new(CountersInner {
            store,
            children: Mutex::new(children),
            router,
            scope,
            facts,
        });
        inner.sync();

        let mut events = inner.router.events();
        let handler = Arc::clone(&inner);
        let effects = tokio::spawn(async move {
            while let Some((id, event)) = events.next().await {
                handler.handle_event(id, event);
            }
        });

        let mut changes = inner.store.subscribe(CountersState::counters_path());
        let syncer = Arc::clone(&inner);
        let reconciler = tokio::spawn(async move {
            while changes.next().await.is_some() {
                syncer.sync();
            }
        });

        Self {
            inner,
            tasks: vec![effects, reconciler],
        }
    }

    pub fn store(&self) -> &Store<CountersState> {
        &self.inner.store
    }

    pub fn send(&self, intent: CountersIntent) -> ChangedPaths {
        let changed = self
            .inner
            .store
            .apply(|state| CountersReducer::reduce(state, intent));
        self.inner.sync();
        changed
    }

    pub fn add_counter(&self, id: Uuid) -> Option<CounterModel> {
        self.send(CountersIntent::AddCounter(id));
        self.counter(id)
    }

    pub fn remove_counter(&self, id: Uuid) {
        self.send(CountersIntent::RemoveCounter(id));
    }

    pub fn counter(&self, id: Uuid) -> Option<CounterModel> {
        self.inner.children.lock().get(&id).cloned()
    }

    /// Child models in list order.
    pub fn counters(&self) -> Vec<CounterModel> {
        self.inner.children.lock().models().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.children.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.children.lock().is_empty()
    }
}

impl Drop for CountersModel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        let ids: Vec<Uuid> = self.inner.children.lock().ids().copied().collect();
        for id in &ids {
            self.inner.scope.cancel_all(id);
        }
    }
}

impl CountersInner {
    /// Reconcile children against the observed list. The state is read under
    /// the children lock so concurrent syncs never apply an older list after
    /// a newer one.
    fn sync(&self) {
        let mut children = self.children.lock();
        let state = self.store.observed_state();
        let result = children.reconcile_identified(&state.counters, |id, counter| {
            CounterModel::new(self.store.clone(), counter, self.router.sender(*id))
        });
        if let Err(err) = result {
            tracing::warn!(error = %err, "Counter list reconciliation failed");
        }
    }

    fn handle_event(&self, id: Uuid, event: CounterEvent) {
        match event {
            CounterEvent::FactRequested(count) => {
                let store = self.store.clone();
                let facts = Arc::clone(&self.facts);
                let path = CountersState::counter_path(id);
                let spawned = self
                    .scope
                    .with_context(id, |context| {
                        context.spawn(async move {
                            let fact = facts.fetch(count).await;
                            tracing::debug!(counter = %id, count, "Fact loaded");
                            reduce_counter(&store, &path, CounterIntent::FactLoaded { count, fact });
                        })
                    })
                    .and_then(|registered| registered);
                if let Err(err) = spawned {
                    tracing::debug!(counter = %id, error = %err, "Fact request dropped");
                }
            }
        }
    }
}
