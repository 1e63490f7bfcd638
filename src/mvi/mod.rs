//! Pure state transitions for feature models.
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ Store
//!    ↑                               │
//!    └──── child models / effects ───┘
//! ```
//!
//! - **State**: value-semantic feature state, owned by a store
//! - **Intent**: user actions or effect results
//! - **Reducer**: pure `(State, Intent) -> State`

mod intent;
mod reducer;
mod state;

pub use intent::Intent;
pub use reducer::Reducer;
pub use state::State;
