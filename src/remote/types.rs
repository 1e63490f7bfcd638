use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::diff::StateDiff;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("History index {index} out of range (retained {first}..{count})")]
    HistoryIndexOutOfRange { index: u64, first: u64, count: u64 },

    #[error("Remote store disconnected")]
    Disconnected,

    #[error("Failed to encode state for diffing: {0}")]
    Encode(String),
}

/// Replay position of a remote store, as published to controllers.
///
/// `index == None` means the store is live and observers follow the most
/// recent entry. `count` is the number of entries ever recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideState {
    pub count: u64,
    pub index: Option<u64>,
}

impl OverrideState {
    /// Wire value asking the store to pause at whatever entry is latest.
    pub const PAUSE_AT_LATEST: u64 = u64::MAX;

    pub fn is_live(&self) -> bool {
        self.index.is_none()
    }
}

/// What a controller asks the observed index to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    /// Follow new entries as they are recorded.
    Live,
    /// Freeze on the entry that is latest right now. Recording continues.
    PauseAtLatest,
    /// Freeze on a specific entry.
    Index(u64),
}

impl Override {
    pub fn from_wire(index: Option<u64>) -> Self {
        match index {
            None => Override::Live,
            Some(OverrideState::PAUSE_AT_LATEST) => Override::PauseAtLatest,
            Some(index) => Override::Index(index),
        }
    }

    pub fn to_wire(self) -> Option<u64> {
        match self {
            Override::Live => None,
            Override::PauseAtLatest => Some(OverrideState::PAUSE_AT_LATEST),
            Override::Index(index) => Some(index),
        }
    }
}

/// Commands a controller sends to a recording store. Fire-and-forget: the
/// only acknowledgement is the next [`OverrideState`] publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RemoteCommand {
    SetOverride { index: Option<u64> },
    PrintDiff { index: u64 },
}

/// Structural difference between a history entry and its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    pub index: u64,
    pub diff: StateDiff,
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry {}:", self.index)?;
        write!(f, "{}", self.diff.render())
    }
}

/// Descriptive metadata naming a remote store (process, host, platform...).
///
/// Doubles as the reconciliation identity: two identifiers are the same
/// remote only if every key/value pair matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteIdentifier(BTreeMap<String, String>);

impl RemoteIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Short label for lists: the process name if present, else all pairs.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.get("process") {
            return match self.get("host") {
                Some(host) => format!("{} @ {}", name, host),
                None => name.to_string(),
            };
        }
        self.entries()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wire_mapping() {
        assert_eq!(Override::from_wire(None), Override::Live);
        assert_eq!(Override::from_wire(Some(u64::MAX)), Override::PauseAtLatest);
        assert_eq!(Override::from_wire(Some(3)), Override::Index(3));
        assert_eq!(Override::PauseAtLatest.to_wire(), Some(u64::MAX));
    }

    #[test]
    fn override_state_serializes_null_index_as_live() {
        let state = OverrideState {
            count: 4,
            index: None,
        };
        let json = serde_json::to_string(&state).expect("serialize");
        assert_eq!(json, r#"{"count":4,"index":null}"#);
        assert!(state.is_live());
    }

    #[test]
    fn commands_are_tagged() {
        let json = serde_json::to_value(RemoteCommand::PrintDiff { index: 2 }).expect("serialize");
        assert_eq!(json, serde_json::json!({"command": "print_diff", "index": 2}));
    }

    #[test]
    fn identifier_equality_is_full_map_equality() {
        let a = RemoteIdentifier::new().with("process", "demo").with("host", "alpha");
        let b = RemoteIdentifier::new().with("host", "alpha").with("process", "demo");
        let c = RemoteIdentifier::new().with("process", "demo");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.display_name(), "demo @ alpha");
    }
}
