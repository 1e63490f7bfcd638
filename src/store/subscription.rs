use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::path::{PathKey, PathView};

/// Type-erased subscriber held by a store.
pub(crate) trait Observer<S>: Send + Sync {
    fn key(&self) -> &PathKey;

    /// Whether the observed path reads differently in `old` and `new`.
    fn differs(&self, old: &S, new: &S) -> bool;

    /// Push the value visible in `observed` if it changed since the last
    /// delivery. Returns false once the subscriber has gone away.
    fn deliver(&mut self, observed: &S) -> bool;
}

pub(crate) struct PathObserver<S, V> {
    path: PathView<S, V>,
    last: Option<V>,
    sender: mpsc::UnboundedSender<V>,
}

impl<S, V> PathObserver<S, V>
where
    S: 'static,
    V: Clone + PartialEq + 'static,
{
    /// Build an observer and the stream it feeds, seeded with the value
    /// currently visible in `observed`.
    pub(crate) fn open(path: PathView<S, V>, observed: &S) -> (Self, Subscription<V>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let last = path.read(observed);
        if let Some(current) = last.clone() {
            let _ = sender.send(current);
        }
        (
            Self {
                path,
                last,
                sender,
            },
            Subscription {
                inner: UnboundedReceiverStream::new(receiver),
            },
        )
    }
}

impl<S, V> Observer<S> for PathObserver<S, V>
where
    S: Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn key(&self) -> &PathKey {
        self.path.key()
    }

    fn differs(&self, old: &S, new: &S) -> bool {
        self.path.read(old) != self.path.read(new)
    }

    fn deliver(&mut self, observed: &S) -> bool {
        if self.sender.is_closed() {
            return false;
        }
        let next = self.path.read(observed);
        if next == self.last {
            return true;
        }
        self.last = next.clone();
        match next {
            Some(value) => self.sender.send(value).is_ok(),
            None => true,
        }
    }
}

/// Stream of values observed at one path.
///
/// Yields the current value first, then one element per observed change.
/// The stream never ends on its own while the store is alive; drop it to
/// unsubscribe.
pub struct Subscription<V> {
    inner: UnboundedReceiverStream<V>,
}

impl<V> Stream for Subscription<V> {
    type Item = V;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<V>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
