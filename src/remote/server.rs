use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::store::Store;

use super::diff::diff_values;
use super::types::{DiffReport, Override, RemoteCommand, RemoteError};

/// Recording side of a time-travel remote.
///
/// Applies controller commands to one store. Failed commands are logged and
/// otherwise ignored; the controller sees their (lack of) effect in the next
/// `OverrideState` publication.
pub struct RemoteServer {
    receiver: mpsc::UnboundedReceiver<RemoteCommand>,
    diffs: broadcast::Sender<DiffReport>,
}

impl RemoteServer {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<RemoteCommand>,
        diffs: broadcast::Sender<DiffReport>,
    ) -> Self {
        Self { receiver, diffs }
    }

    pub async fn run<S>(mut self, store: Store<S>)
    where
        S: Clone + PartialEq + Serialize + Send + Sync + 'static,
    {
        while let Some(command) = self.receiver.recv().await {
            if let Err(err) = self.handle(&store, command) {
                tracing::warn!(error = %err, "Remote command ignored");
            }
        }
        tracing::debug!("Remote command channel closed");
    }

    pub fn handle<S>(&self, store: &Store<S>, command: RemoteCommand) -> Result<(), RemoteError>
    where
        S: Clone + PartialEq + Serialize + Send + Sync + 'static,
    {
        match command {
            RemoteCommand::SetOverride { index } => {
                let state = store.set_override(Override::from_wire(index))?;
                tracing::info!(count = state.count, index = ?state.index, "Override applied");
            }
            RemoteCommand::PrintDiff { index } => {
                let report = diff_entry(store, index)?;
                tracing::info!(index, "State diff\n{}", report.diff.render());
                if self.diffs.send(report).is_err() {
                    tracing::trace!("Remote: diff report dropped (no listeners)");
                }
            }
        }
        Ok(())
    }
}

/// Diff history entry `index` against its predecessor. Entry 0 is diffed
/// against the store's initial state.
pub fn diff_entry<S>(store: &Store<S>, index: u64) -> Result<DiffReport, RemoteError>
where
    S: Clone + PartialEq + Serialize + Send + Sync + 'static,
{
    let (before, after) = store.history_pair(index)?;
    let before = serde_json::to_value(&*before).map_err(|e| RemoteError::Encode(e.to_string()))?;
    let after = serde_json::to_value(&*after).map_err(|e| RemoteError::Encode(e.to_string()))?;
    Ok(DiffReport {
        index,
        diff: diff_values(&before, &after),
    })
}
