//! Unidirectional state management with identity-stable child models and
//! time-travel debugging.
//!
//! A [`store::Store`] owns a value-semantic state tree and serializes every
//! write. [`path::PathView`]s address sub-values of that tree, child models
//! are kept in step with identified collections by
//! [`reconcile::ModelContainer`], their tasks are grouped per identity in a
//! [`cancel::CancellationScope`], and their events reach ancestors through an
//! [`events::EventRouter`]. Every recorded state can be replayed and diffed
//! from a [`remote`] controller.

pub mod cancel;
pub mod config;
pub mod counters;
pub mod error;
pub mod events;
pub mod identified;
pub mod mvi;
pub mod path;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
