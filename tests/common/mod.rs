//! Shared test utilities and fixture state.

#![allow(dead_code, unused_imports)]

use std::time::Duration;

use arbor::identified::{Identifiable, IdentifiedVec};
use arbor::path::PathView;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

/// Upper bound for anything a test awaits.
pub const STEP: Duration = Duration::from_secs(2);

/// Wait for the next element. `None` if the stream stays quiet for `quiet`
/// or ends.
pub async fn next_within<S>(stream: &mut S, quiet: Duration) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(quiet, stream.next()).await.ok().flatten()
}

/// Poll `condition` until it holds, failing the test after [`STEP`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(STEP, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: u32,
    pub label: String,
}

impl Identifiable for Row {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draft {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[default]
    Idle,
    Editing(Draft),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Doc {
    pub title: String,
    pub count: i64,
    pub rows: IdentifiedVec<u32, Row>,
    pub mode: Mode,
}

impl Doc {
    pub fn with_rows(ids: impl IntoIterator<Item = u32>) -> Self {
        let rows = IdentifiedVec::try_from_items(ids.into_iter().map(|id| Row {
            id,
            label: format!("row {}", id),
        }))
        .expect("unique row ids");
        Self {
            rows,
            ..Self::default()
        }
    }
}

pub fn title() -> PathView<Doc, String> {
    PathView::field("title", |d: &Doc| &d.title, |d, v| d.title = v)
}

pub fn count() -> PathView<Doc, i64> {
    PathView::field("count", |d: &Doc| &d.count, |d, v| d.count = v)
}

pub fn rows() -> PathView<Doc, IdentifiedVec<u32, Row>> {
    PathView::field("rows", |d: &Doc| &d.rows, |d, v| d.rows = v)
}

pub fn label() -> PathView<Row, String> {
    PathView::field("label", |r: &Row| &r.label, |r, v| r.label = v)
}

pub fn row_label(id: u32) -> PathView<Doc, String> {
    rows().then(&PathView::element(id)).then(&label())
}

pub fn mode() -> PathView<Doc, Mode> {
    PathView::field("mode", |d: &Doc| &d.mode, |d, v| d.mode = v)
}

pub fn editing() -> PathView<Mode, Draft> {
    PathView::case(
        "Editing",
        |m: &Mode| match m {
            Mode::Editing(draft) => Some(draft.clone()),
            Mode::Idle => None,
        },
        Mode::Editing,
    )
}

pub fn text() -> PathView<Draft, String> {
    PathView::field("text", |d: &Draft| &d.text, |d, v| d.text = v)
}

/// `mode/Editing.text`: misses while idle.
pub fn draft_text() -> PathView<Doc, String> {
    mode().then(&editing()).then(&text())
}
