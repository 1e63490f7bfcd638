use uuid::Uuid;

use crate::mvi::Intent;

/// Actions on a single counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterIntent {
    Increment,
    Decrement,
    /// Ask for a fact about the current count. Handled as an effect by the
    /// parent; the reducer leaves state untouched.
    FactButtonTapped,
    /// Result of the fact effect.
    FactLoaded { count: i64, fact: String },
    DismissPrompt,
}

impl Intent for CounterIntent {}

/// Actions on the counter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountersIntent {
    AddCounter(Uuid),
    RemoveCounter(Uuid),
}

impl Intent for CountersIntent {}

/// Events a counter raises toward its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEvent {
    FactRequested(i64),
}
