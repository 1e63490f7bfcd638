use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::BoxStream;
use tokio::sync::watch;

use super::types::RemoteIdentifier;
use super::{watch_stream, RemoteHandle};

/// Every remote currently reachable, keyed by identity.
pub type RemoteMap = HashMap<RemoteIdentifier, Arc<dyn RemoteHandle>>;

/// Source of remote-store snapshots.
pub trait RemoteBrowser: Send + Sync {
    /// Full snapshots of the reachable remotes, starting with the current
    /// one. Each call starts an independent browse.
    fn browse(&self) -> BoxStream<'static, RemoteMap>;
}

/// In-process registry: stores announce themselves with [`publish`] and go
/// away with [`withdraw`].
///
/// [`publish`]: LocalBrowser::publish
/// [`withdraw`]: LocalBrowser::withdraw
pub struct LocalBrowser {
    remotes: watch::Sender<RemoteMap>,
}

impl Default for LocalBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBrowser {
    pub fn new() -> Self {
        let (remotes, _) = watch::channel(RemoteMap::new());
        Self { remotes }
    }

    /// Announce a remote, replacing any handle published under the same
    /// identifier.
    pub fn publish(&self, id: RemoteIdentifier, handle: Arc<dyn RemoteHandle>) {
        tracing::debug!(remote = %id.display_name(), "Remote published");
        self.remotes.send_modify(|remotes| {
            remotes.insert(id, handle);
        });
    }

    pub fn withdraw(&self, id: &RemoteIdentifier) -> bool {
        let mut removed = false;
        self.remotes.send_if_modified(|remotes| {
            removed = remotes.remove(id).is_some();
            removed
        });
        if removed {
            tracing::debug!(remote = %id.display_name(), "Remote withdrawn");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.remotes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.borrow().is_empty()
    }
}

impl RemoteBrowser for LocalBrowser {
    fn browse(&self) -> BoxStream<'static, RemoteMap> {
        watch_stream(self.remotes.subscribe())
    }
}
