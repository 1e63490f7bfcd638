use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identified::{Identifiable, IdentifiedVec};
use crate::mvi::State;
use crate::path::PathView;

/// A fact fetched for a specific count, shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPrompt {
    pub count: i64,
    pub fact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub id: Uuid,
    pub count: i64,
    pub fact_prompt: Option<FactPrompt>,
}

impl CounterState {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            count: 0,
            fact_prompt: None,
        }
    }

    pub fn count_path() -> PathView<CounterState, i64> {
        PathView::field("count", |s: &CounterState| &s.count, |s, v| s.count = v)
    }

    pub fn fact_prompt_path() -> PathView<CounterState, Option<FactPrompt>> {
        PathView::field(
            "fact_prompt",
            |s: &CounterState| &s.fact_prompt,
            |s, v| s.fact_prompt = v,
        )
    }

    /// The prompt itself, absent while dismissed.
    pub fn prompt_path() -> PathView<CounterState, FactPrompt> {
        Self::fact_prompt_path().then(&PathView::some())
    }
}

impl Identifiable for CounterState {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl State for CounterState {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersState {
    pub counters: IdentifiedVec<Uuid, CounterState>,
}

impl CountersState {
    pub fn counters_path() -> PathView<CountersState, IdentifiedVec<Uuid, CounterState>> {
        PathView::field(
            "counters",
            |s: &CountersState| &s.counters,
            |s, v| s.counters = v,
        )
    }

    pub fn counter_path(id: Uuid) -> PathView<CountersState, CounterState> {
        Self::counters_path().then(&PathView::element(id))
    }
}

impl State for CountersState {}
