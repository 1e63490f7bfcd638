//! Time-travel control between a recording store and its controllers.
//!
//! The recording side runs a [`RemoteServer`] next to its store; controllers
//! hold a [`RemoteHandle`] and receive [`OverrideState`] publications.
//! [`RemoteList`] keeps one [`RemoteModel`] per reachable store.

mod client;
pub mod diff;
mod discovery;
mod list;
mod server;
mod types;


pub use client::{connect, LocalRemote};
pub use diff::{diff_values, StateChange, StateDiff};
pub use discovery::{LocalBrowser, RemoteBrowser, RemoteMap};
pub use list::{RemoteList, RemoteModel};
pub use server::{diff_entry, RemoteServer};
pub use types::{DiffReport, Override, OverrideState, RemoteCommand, RemoteError, RemoteIdentifier};

use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Controller's connection to one recording store.
///
/// Commands are fire-and-forget; their effect shows up in the state stream.
pub trait RemoteHandle: Send + Sync {
    /// The store's current [`OverrideState`], then every later publication.
    fn state_stream(&self) -> BoxStream<'static, OverrideState>;

    fn set_override(&self, request: Override);

    /// Ask the store to log the diff of entry `index` against its
    /// predecessor.
    fn print_diff(&self, index: u64);
}

/// Stream a watch channel: the current value first, then each change. Ends
/// when the sender is dropped.
pub(crate) fn watch_stream<T>(receiver: watch::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + Sync + 'static,
{
    WatchStream::new(receiver).boxed()
}
