//! Counter list feature.
//!
//! A parent [`CountersModel`] owns the store and one [`CounterModel`] per
//! counter. Counters ask for number facts by raising
//! [`CounterEvent::FactRequested`]; the parent performs the fetch through a
//! [`FactClient`] and writes the result back as a dismissible prompt.

mod fact;
mod intent;
mod model;
mod reducer;
mod state;

pub use fact::{FactClient, NumberFactClient};
pub use intent::{CounterEvent, CounterIntent, CountersIntent};
pub use model::{CounterModel, CountersModel};
pub use reducer::{CounterReducer, CountersReducer};
pub use state::{CounterState, CountersState, FactPrompt};
