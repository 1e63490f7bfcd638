use futures_util::stream::BoxStream;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};

use crate::store::Store;

use super::server::RemoteServer;
use super::types::{DiffReport, Override, OverrideState, RemoteCommand, RemoteError};
use super::{watch_stream, RemoteHandle};

const DIFF_BUFFER: usize = 16;

/// Connect a controller to `store`, returning the handle and the server that
/// must be driven (see [`RemoteServer::run`]) for commands to take effect.
pub fn connect<S>(store: &Store<S>) -> (LocalRemote, RemoteServer)
where
    S: Clone + PartialEq + Serialize + Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let (diffs, _) = broadcast::channel(DIFF_BUFFER);
    let client = LocalRemote {
        sender,
        states: store.override_states(),
        diffs: diffs.clone(),
    };
    (client, RemoteServer::new(receiver, diffs))
}

/// In-process [`RemoteHandle`] talking to a [`RemoteServer`].
#[derive(Clone)]
pub struct LocalRemote {
    sender: mpsc::UnboundedSender<RemoteCommand>,
    states: watch::Receiver<OverrideState>,
    diffs: broadcast::Sender<DiffReport>,
}

impl LocalRemote {
    /// Diff reports produced by `print_diff` requests from any controller.
    pub fn diff_reports(&self) -> broadcast::Receiver<DiffReport> {
        self.diffs.subscribe()
    }

    /// Whether the server side is still accepting commands.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue `command` for the server.
    pub fn request(&self, command: RemoteCommand) -> Result<(), RemoteError> {
        self.sender
            .send(command)
            .map_err(|_| RemoteError::Disconnected)
    }

    fn send(&self, command: RemoteCommand) {
        if self.request(command).is_err() {
            tracing::trace!("Remote: command dropped (server gone)");
        }
    }
}

impl RemoteHandle for LocalRemote {
    fn state_stream(&self) -> BoxStream<'static, OverrideState> {
        watch_stream(self.states.clone())
    }

    fn set_override(&self, request: Override) {
        self.send(RemoteCommand::SetOverride {
            index: request.to_wire(),
        });
    }

    fn print_diff(&self, index: u64) {
        self.send(RemoteCommand::PrintDiff { index });
    }
}
