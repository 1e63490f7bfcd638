use super::intent::Intent;
use super::state::State;

/// The only place where feature state transitions happen.
///
/// Must be pure: no I/O, no clocks, no channels. Effects are raised as events
/// by the model that dispatches the intent.
pub trait Reducer {
    type State: State;

    type Intent: Intent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}
