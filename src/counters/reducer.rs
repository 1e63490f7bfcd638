//! Reducers for the counter list and individual counters.

use crate::mvi::Reducer;

use super::intent::{CounterIntent, CountersIntent};
use super::state::{CounterState, CountersState, FactPrompt};

pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Intent = CounterIntent;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            CounterIntent::Increment => state.count = state.count.saturating_add(1),
            CounterIntent::Decrement => state.count = state.count.saturating_sub(1),
            CounterIntent::FactButtonTapped => {}
            CounterIntent::FactLoaded { count, fact } => {
                state.fact_prompt = Some(FactPrompt { count, fact });
            }
            CounterIntent::DismissPrompt => state.fact_prompt = None,
        }
        state
    }
}

pub struct CountersReducer;

impl Reducer for CountersReducer {
    type State = CountersState;
    type Intent = CountersIntent;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            CountersIntent::AddCounter(id) => {
                // Adding an existing identity is ignored
                state.counters.push_item(CounterState::new(id));
            }
            CountersIntent::RemoveCounter(id) => {
                state.counters.remove(&id);
            }
        }
        state
    }
}
