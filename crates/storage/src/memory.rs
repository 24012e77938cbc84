//! MemoryStore: ordered multi-version storage with BTreeMap and RwLock
//!
//! This module implements the committed-state side of the store using:
//! - `BTreeMap<Vec<u8>, VersionChain>` for ordered key storage with history
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for the published (visible) version
//!
//! # Design Notes
//!
//! - **Publish after apply**: a commit's entries are written under the write
//!   lock and the visible version is bumped before the lock is released, so
//!   no reader can begin at a version whose writes are half applied.
//! - **Retained floor**: history below `floor` may be pruned. Reads at a
//!   version older than the floor fail with `TransactionTooOld`.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use stored_core::{KeyRange, KeyValue, Result, StoredError};

use crate::chain::VersionChain;

/// A buffered point write: `Some(bytes)` sets, `None` clears
pub type PointWrite = (Vec<u8>, Option<Vec<u8>>);

/// Ordered multi-version key-value storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// The main data store: ordered map from key to its version chain
    data: Arc<RwLock<BTreeMap<Vec<u8>, VersionChain>>>,
    /// Newest fully applied commit version
    version: AtomicU64,
    /// Oldest version whose state is still fully retained
    floor: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty MemoryStore
    ///
    /// Initial version is 0 (no writes have occurred).
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest committed version visible to new transactions
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Oldest readable version
    pub fn floor(&self) -> u64 {
        self.floor.load(Ordering::SeqCst)
    }

    fn check_readable(&self, read_version: u64) -> Result<()> {
        let floor = self.floor();
        if read_version < floor {
            return Err(StoredError::TransactionTooOld {
                read_version,
                floor,
            });
        }
        Ok(())
    }

    /// Value of `key` as of `read_version`
    ///
    /// # Errors
    ///
    /// Returns `TransactionTooOld` when `read_version` predates the floor.
    pub fn get(&self, key: &[u8], read_version: u64) -> Result<Option<Vec<u8>>> {
        let data = self.data.read();
        self.check_readable(read_version)?;
        Ok(data
            .get(key)
            .and_then(|chain| chain.at(read_version))
            .map(|v| v.to_vec()))
    }

    /// Live rows of `range` as of `read_version`
    ///
    /// Rows are returned in scan order (descending when `reverse`), truncated
    /// to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionTooOld` when `read_version` predates the floor.
    pub fn scan(
        &self,
        range: &KeyRange,
        read_version: u64,
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Vec<KeyValue>> {
        let data = self.data.read();
        self.check_readable(read_version)?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let bounds = (
            Bound::Included(range.begin.as_slice()),
            Bound::Excluded(range.end.as_slice()),
        );
        let live = |(key, chain): (&Vec<u8>, &VersionChain)| {
            chain
                .at(read_version)
                .map(|value| KeyValue::new(key.clone(), value.to_vec()))
        };
        let limit = limit.unwrap_or(usize::MAX);
        let rows = if reverse {
            data.range::<[u8], _>(bounds)
                .rev()
                .filter_map(live)
                .take(limit)
                .collect()
        } else {
            data.range::<[u8], _>(bounds)
                .filter_map(live)
                .take(limit)
                .collect()
        };
        Ok(rows)
    }

    /// Apply one commit atomically and publish its version
    ///
    /// Range clears are applied before point writes, so a set issued after a
    /// range clear in the same transaction survives.
    ///
    /// # Returns
    ///
    /// The commit version assigned to every write.
    pub fn apply(&self, cleared: &[KeyRange], writes: &[PointWrite]) -> u64 {
        let mut data = self.data.write();
        let version = self.version.load(Ordering::SeqCst) + 1;
        let floor = self.floor();

        for range in cleared {
            if range.is_empty() {
                continue;
            }
            let bounds = (
                Bound::Included(range.begin.as_slice()),
                Bound::Excluded(range.end.as_slice()),
            );
            for (_, chain) in data.range_mut::<[u8], _>(bounds) {
                if chain.at(version - 1).is_some() {
                    chain.push(version, None);
                    chain.prune(floor);
                }
            }
        }

        for (key, value) in writes {
            let chain = data.entry(key.clone()).or_default();
            if chain.latest_version() == Some(version) {
                // Already tombstoned by a range clear above
                chain.pop_latest();
            }
            chain.push(version, value.clone());
            chain.prune(floor);
        }

        self.version.store(version, Ordering::SeqCst);
        version
    }

    /// Raise the retained floor and drop fully dead keys
    ///
    /// Readers at versions below the new floor will receive
    /// `TransactionTooOld`.
    pub fn advance_floor(&self, floor: u64) {
        let mut data = self.data.write();
        let floor = floor.min(self.current_version());
        if floor <= self.floor() {
            return;
        }
        self.floor.store(floor, Ordering::SeqCst);
        let before = data.len();
        data.retain(|_, chain| {
            chain.prune(floor);
            !chain.is_dead(floor)
        });
        debug!(
            floor,
            removed = before - data.len(),
            "advanced retained floor"
        );
    }

    /// Number of keys with a retained chain (including tombstoned keys)
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }
}
