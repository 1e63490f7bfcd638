//! Cancellation of stream consumers grouped by context id.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arbor::cancel::{CancelError, CancellationScope, ContextState};
use common::STEP;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Endless source ticking every millisecond.
fn ticks() -> impl futures_util::Stream<Item = u64> + Send {
    stream::unfold(0u64, |n| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Some((n, n + 1))
    })
}

#[tokio::test]
async fn cancelled_subscription_stops_producing() {
    let scope: CancellationScope<String> = CancellationScope::new();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    scope
        .with_context("feed".to_string(), |context| {
            context.for_each(ticks(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .expect("open")
        .expect("subscribe");

    tokio::time::timeout(STEP, async {
        while delivered.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("ticks delivered");

    scope.cancel_all(&"feed".to_string());
    tokio::task::yield_now().await;
    let at_cancel = delivered.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), at_cancel);
    assert_eq!(scope.state(&"feed".to_string()), ContextState::Cancelled);
}

#[tokio::test]
async fn late_elements_are_discarded_not_buffered() {
    let scope: CancellationScope<u8> = CancellationScope::new();
    let (source_tx, source_rx) = mpsc::unbounded_channel::<u32>();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let source = UnboundedReceiverStream::new(source_rx);

    scope
        .context(1)
        .expect("open")
        .for_each_async(source, move |value| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(value);
            }
        })
        .expect("subscribe");

    source_tx.send(10).expect("send");
    let first = tokio::time::timeout(STEP, seen_rx.recv()).await.expect("first");
    assert_eq!(first, Some(10));

    scope.cancel_all(&1);
    let _ = source_tx.send(11);
    let _ = source_tx.send(12);

    let rest = tokio::time::timeout(STEP, seen_rx.recv()).await.expect("closed");
    assert_eq!(rest, None);
    assert!(source_tx.is_closed());
}

#[tokio::test]
async fn nested_contexts_follow_their_parent() {
    let scope: CancellationScope<&'static str> = CancellationScope::new();
    let parent = scope.context("screen").expect("parent");
    let row = scope.nest(&"screen", "row").expect("row");
    let cell = scope.nest(&"row", "cell").expect("cell");
    for context in [&parent, &row, &cell] {
        context.spawn(std::future::pending()).expect("spawn");
    }

    assert_eq!(scope.cancel_all(&"screen"), 3);
    for id in ["screen", "row", "cell"] {
        assert_eq!(scope.state(&id), ContextState::Cancelled);
    }
    assert!(matches!(
        cell.spawn(async {}),
        Err(CancelError::ContextAlreadyCancelled { .. })
    ));
    assert_eq!(scope.cancel_all(&"screen"), 0);
}
