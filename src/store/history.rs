//! Append-only record of every state a store has held.

use std::collections::VecDeque;
use std::sync::Arc;

/// How many history entries a store retains.
///
/// The default is [`HistoryPolicy::Unbounded`]: every transition is kept for
/// the life of the process, so a long-running store grows without limit.
/// Use [`HistoryPolicy::Capped`] to evict the oldest entries instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryPolicy {
    #[default]
    Unbounded,
    Capped(usize),
}

/// Recorded store states, addressed by absolute index.
///
/// Indices are assigned once and never reused. Eviction advances
/// [`HistoryLog::first_index`]; the most recently evicted state becomes the
/// baseline the first retained entry diffs against.
#[derive(Debug)]
pub struct HistoryLog<S> {
    entries: VecDeque<Arc<S>>,
    first_index: u64,
    baseline: Arc<S>,
    policy: HistoryPolicy,
}

impl<S> HistoryLog<S> {
    /// Start an empty log. `initial` is the state entry 0 diffs against.
    pub fn new(initial: Arc<S>, policy: HistoryPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            first_index: 0,
            baseline: initial,
            policy,
        }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Append a state; returns its absolute index.
    pub fn append(&mut self, state: Arc<S>) -> u64 {
        self.entries.push_back(state);
        if let HistoryPolicy::Capped(max) = self.policy {
            let max = max.max(1);
            while self.entries.len() > max {
                if let Some(evicted) = self.entries.pop_front() {
                    self.baseline = evicted;
                    self.first_index += 1;
                }
            }
        }
        self.count() - 1
    }

    /// Total number of entries ever recorded.
    pub fn count(&self) -> u64 {
        self.first_index + self.entries.len() as u64
    }

    /// Oldest index still retained.
    pub fn first_index(&self) -> u64 {
        self.first_index
    }

    pub fn retained(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest_index(&self) -> Option<u64> {
        self.count().checked_sub(1).filter(|_| !self.entries.is_empty())
    }

    pub fn get(&self, index: u64) -> Option<&Arc<S>> {
        let offset = index.checked_sub(self.first_index)?;
        self.entries.get(usize::try_from(offset).ok()?)
    }

    /// The state entry `index` should be diffed against: the previous entry,
    /// or the baseline for the first retained one. Never underflows.
    pub fn predecessor(&self, index: u64) -> Option<&Arc<S>> {
        if index == self.first_index {
            return self.get(index).map(|_| &self.baseline);
        }
        self.get(index)?;
        self.get(index - 1)
    }
}
