//! Per-key version chains
//!
//! Each key keeps its recent history as `(version, Option<bytes>)` entries in
//! ascending version order. `None` is a tombstone left by a clear.

use smallvec::SmallVec;

/// Version history of one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionChain {
    entries: SmallVec<[(u64, Option<Vec<u8>>); 2]>,
}

impl VersionChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; `version` must be greater than every existing entry
    pub fn push(&mut self, version: u64, value: Option<Vec<u8>>) {
        debug_assert!(self.entries.last().map_or(true, |(v, _)| *v < version));
        self.entries.push((version, value));
    }

    /// Live value visible at `read_version`
    ///
    /// Returns `None` if the newest entry at or below `read_version` is a
    /// tombstone, or if no such entry exists.
    pub fn at(&self, read_version: u64) -> Option<&[u8]> {
        self.entries
            .iter()
            .rev()
            .find(|(v, _)| *v <= read_version)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Remove the newest entry
    pub fn pop_latest(&mut self) -> Option<(u64, Option<Vec<u8>>)> {
        self.entries.pop()
    }

    /// Version of the newest entry
    pub fn latest_version(&self) -> Option<u64> {
        self.entries.last().map(|(v, _)| *v)
    }

    /// Drop entries no reader at or above `floor` can observe
    ///
    /// Keeps every entry newer than `floor` plus the newest entry at or
    /// below it.
    pub fn prune(&mut self, floor: u64) {
        let keep_from = self
            .entries
            .iter()
            .rposition(|(v, _)| *v <= floor)
            .unwrap_or(0);
        if keep_from > 0 {
            self.entries.drain(..keep_from);
        }
    }

    /// Whether the chain holds only a tombstone at or below `floor`
    pub fn is_dead(&self, floor: u64) -> bool {
        match self.entries.as_slice() {
            [] => true,
            [(v, None)] => *v <= floor,
            _ => false,
        }
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
