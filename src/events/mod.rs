//! Child-to-ancestor event delivery.
//!
//! Child models hold an [`EventSender`] tagged with their identity and emit
//! typed events into it. Ancestors consume [`RoutedEvents`], a stream of
//! `(identity, event)` pairs. Membership is checked on emit and again on
//! delivery, so nothing raised by a removed child ever reaches a handler.

use std::fmt;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::reconcile::Membership;

type Subscribers<Id, E> = Arc<Mutex<Vec<mpsc::UnboundedSender<(Id, E)>>>>;

/// Routes events from the children of one container to its subscribers.
pub struct EventRouter<Id, E> {
    membership: Membership<Id>,
    subscribers: Subscribers<Id, E>,
}

impl<Id, E> Clone for EventRouter<Id, E> {
    fn clone(&self) -> Self {
        Self {
            membership: self.membership.clone(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<Id, E> EventRouter<Id, E>
where
    Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    /// Route events for the children whose identities `membership` tracks,
    /// typically [`ModelContainer::membership`](crate::reconcile::ModelContainer::membership).
    pub fn new(membership: Membership<Id>) -> Self {
        Self {
            membership,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Outbound channel for the child identified by `id`.
    pub fn sender(&self, id: Id) -> EventSender<Id, E> {
        EventSender {
            id,
            router: self.clone(),
        }
    }

    /// Every event raised by a current or future child from now on.
    ///
    /// Events from one child arrive in the order they were raised.
    pub fn events(&self) -> RoutedEvents<Id, E> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(sender);
        RoutedEvents {
            inner: UnboundedReceiverStream::new(receiver),
            membership: self.membership.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| !sender.is_closed());
        subscribers.len()
    }

    fn route(&self, id: &Id, event: E) -> bool {
        if !self.membership.contains(id) {
            tracing::trace!(child = ?id, "Dropped event from removed child");
            return false;
        }
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| sender.send((id.clone(), event.clone())).is_ok());
        !subscribers.is_empty()
    }
}

/// A child's handle for raising events.
pub struct EventSender<Id, E> {
    id: Id,
    router: EventRouter<Id, E>,
}

impl<Id: Clone, E> Clone for EventSender<Id, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            router: self.router.clone(),
        }
    }
}

impl<Id, E> EventSender<Id, E>
where
    Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Raise `event`. Returns false if it was dropped, either because the
    /// child is no longer a member or because nobody is listening.
    pub fn emit(&self, event: E) -> bool {
        self.router.route(&self.id, event)
    }
}

/// Stream of `(child identity, event)` pairs.
pub struct RoutedEvents<Id, E> {
    inner: UnboundedReceiverStream<(Id, E)>,
    membership: Membership<Id>,
}

impl<Id, E> Stream for RoutedEvents<Id, E>
where
    Id: Eq + Hash + fmt::Debug,
{
    type Item = (Id, E);

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some((id, event))) => {
                    if self.membership.contains(&id) {
                        return Poll::Ready(Some((id, event)));
                    }
                    tracing::trace!(child = ?id, "Discarded queued event from removed child");
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{ModelContainer, Reconcilable};
    use futures_util::StreamExt;
    use std::time::Duration;

    struct Child;

    impl Reconcilable for Child {
        type Id = u32;
        type State = ();

        fn rebind(&self, _state: ()) {}
    }

    fn container(ids: &[u32]) -> ModelContainer<Child> {
        let mut container = ModelContainer::new();
        container
            .reconcile(ids.iter().map(|id| (*id, ())), |_, _| Child)
            .expect("unique ids");
        container
    }

    async fn next(events: &mut RoutedEvents<u32, &'static str>) -> Option<(u32, &'static str)> {
        tokio::time::timeout(Duration::from_millis(100), events.next())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn delivers_in_raise_order_per_child() {
        let children = container(&[1, 2]);
        let router = EventRouter::new(children.membership());
        let mut events = router.events();

        let one = router.sender(1);
        let two = router.sender(2);
        assert!(one.emit("a"));
        assert!(two.emit("x"));
        assert!(one.emit("b"));

        let received: Vec<_> = vec![
            next(&mut events).await,
            next(&mut events).await,
            next(&mut events).await,
        ];
        let from_one: Vec<_> = received
            .iter()
            .flatten()
            .filter(|(id, _)| *id == 1)
            .map(|(_, e)| *e)
            .collect();
        assert_eq!(from_one, vec!["a", "b"]);
        assert!(received.contains(&Some((2, "x"))));
    }

    #[tokio::test]
    async fn events_from_removed_children_are_dropped() {
        let mut children = container(&[1, 2]);
        let router = EventRouter::new(children.membership());
        let mut events = router.events();
        let one = router.sender(1);

        one.emit("queued");
        children
            .reconcile([(2, ())], |_, _| Child)
            .expect("unique ids");
        assert!(!one.emit("late"));
        assert_eq!(next(&mut events).await, None);
    }

    #[tokio::test]
    async fn future_children_reach_existing_subscribers() {
        let mut children = container(&[]);
        let router = EventRouter::new(children.membership());
        let mut events = router.events();

        children.reconcile([(7, ())], |_, _| Child).expect("unique ids");
        router.sender(7).emit("hello");
        assert_eq!(next(&mut events).await, Some((7, "hello")));
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let children = container(&[1]);
        let router: EventRouter<u32, &'static str> = EventRouter::new(children.membership());
        drop(router.events());
        assert_eq!(router.subscriber_count(), 0);
        assert!(!router.sender(1).emit("nobody"));
    }
}
