//! Transaction context for OCC
//!
//! This module implements the transaction handle for optimistic concurrency
//! control. TransactionContext tracks read conflict ranges, buffered writes
//! and write conflict ranges, enabling validation at commit time.
//!
//! # Read-your-writes
//!
//! Buffered sets, clears and range clears are overlaid on the snapshot the
//! transaction reads from. Every read reflects the buffered state at the
//! moment the read is issued; later writes do not change an issued read.
//!
//! # Snapshot mode
//!
//! A snapshot context records no read conflicts. It is only ever handed out
//! through [`ReadTransaction`], so it can never buffer writes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::Mutex;

use stored_core::{
    KeyRange, KeySelector, KeyValue, RangeOptions, RangeResult, ReadFuture, ReadTransaction,
    Result, Transaction, END_KEY,
};
use stored_storage::{MemoryStore, PointWrite};

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Committed` (validation passed)
/// - `Active` → `Aborted` (conflict detected or closure error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// Summary of buffered operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingOperations {
    /// Number of buffered sets
    pub sets: usize,
    /// Number of buffered point clears
    pub clears: usize,
    /// Number of buffered range clears
    pub range_clears: usize,
}

impl PendingOperations {
    /// Total number of pending operations
    pub fn total(&self) -> usize {
        self.sets + self.clears + self.range_clears
    }

    /// Check if there are no pending operations
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Default)]
struct TxnState {
    /// Point writes: `Some` = set, `None` = clear
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    /// Range clears, in issue order
    cleared: Vec<KeyRange>,
    /// Read conflict ranges
    reads: Vec<KeyRange>,
    /// Write conflict ranges
    write_ranges: Vec<KeyRange>,
    status: Option<TransactionStatus>,
}

impl TxnState {
    fn is_cleared(&self, key: &[u8]) -> bool {
        self.cleared.iter().any(|r| r.contains(key))
    }
}

/// Buffered writes of a finished transaction, ready to apply
#[derive(Debug, Default)]
pub struct WriteSet {
    /// Range clears (applied first)
    pub cleared: Vec<KeyRange>,
    /// Point writes
    pub writes: Vec<PointWrite>,
    /// Read conflict ranges to validate
    pub reads: Vec<KeyRange>,
    /// Write conflict ranges to publish
    pub write_ranges: Vec<KeyRange>,
}

impl WriteSet {
    /// Whether the transaction buffered no writes
    pub fn is_read_only(&self) -> bool {
        self.cleared.is_empty() && self.writes.is_empty()
    }
}

/// A single transaction attempt against a [`MemoryStore`]
#[derive(Debug)]
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,
    store: Arc<MemoryStore>,
    read_version: u64,
    snapshot: bool,
    state: Mutex<TxnState>,
}

impl TransactionContext {
    /// Begin a read-write transaction at the store's current version
    pub fn new(txn_id: u64, store: Arc<MemoryStore>) -> Self {
        let read_version = store.current_version();
        Self {
            txn_id,
            store,
            read_version,
            snapshot: false,
            state: Mutex::new(TxnState::default()),
        }
    }

    /// Begin a snapshot (conflict-free, read-only) transaction
    pub fn snapshot(txn_id: u64, store: Arc<MemoryStore>) -> Self {
        Self {
            snapshot: true,
            ..Self::new(txn_id, store)
        }
    }

    /// Whether this is a snapshot context
    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.state
            .lock()
            .status
            .clone()
            .unwrap_or(TransactionStatus::Active)
    }

    /// Mark the transaction as aborted
    pub fn mark_aborted(&self, reason: impl Into<String>) {
        self.state.lock().status = Some(TransactionStatus::Aborted {
            reason: reason.into(),
        });
    }

    pub(crate) fn mark_committed(&self) {
        self.state.lock().status = Some(TransactionStatus::Committed);
    }

    /// Counts of buffered operations
    pub fn pending_operations(&self) -> PendingOperations {
        let state = self.state.lock();
        let clears = state.writes.values().filter(|w| w.is_none()).count();
        PendingOperations {
            sets: state.writes.len() - clears,
            clears,
            range_clears: state.cleared.len(),
        }
    }

    /// Number of recorded read conflict ranges
    pub fn read_count(&self) -> usize {
        self.state.lock().reads.len()
    }

    /// Take the buffered writes and conflict ranges for commit
    pub fn take_write_set(&self) -> WriteSet {
        let mut state = self.state.lock();
        WriteSet {
            cleared: std::mem::take(&mut state.cleared),
            writes: std::mem::take(&mut state.writes).into_iter().collect(),
            reads: std::mem::take(&mut state.reads),
            write_ranges: std::mem::take(&mut state.write_ranges),
        }
    }

    fn record_read(&self, state: &mut TxnState, range: KeyRange) {
        if !self.snapshot {
            state.reads.push(range);
        }
    }

    /// Merged view of `range`: snapshot rows overlaid with buffered writes
    fn merged_rows(
        &self,
        state: &TxnState,
        range: &KeyRange,
        limit: Option<usize>,
        reverse: bool,
    ) -> Result<Vec<KeyValue>> {
        if state.writes.is_empty() && state.cleared.is_empty() {
            return self.store.scan(range, self.read_version, limit, reverse);
        }
        let mut rows: BTreeMap<Vec<u8>, Vec<u8>> = self
            .store
            .scan(range, self.read_version, None, false)?
            .into_iter()
            .filter(|kv| !state.is_cleared(&kv.key))
            .map(|kv| (kv.key, kv.value))
            .collect();
        if !range.is_empty() {
            let bounds = (
                Bound::Included(range.begin.as_slice()),
                Bound::Excluded(range.end.as_slice()),
            );
            for (key, write) in state.writes.range::<[u8], _>(bounds) {
                match write {
                    Some(value) => {
                        rows.insert(key.clone(), value.clone());
                    }
                    None => {
                        rows.remove(key);
                    }
                }
            }
        }
        let limit = limit.unwrap_or(usize::MAX);
        let rows = rows.into_iter().map(|(k, v)| KeyValue::new(k, v));
        Ok(if reverse {
            rows.rev().take(limit).collect()
        } else {
            rows.take(limit).collect()
        })
    }
}

impl ReadTransaction for TransactionContext {
    fn read_version(&self) -> u64 {
        self.read_version
    }

    fn get(&self, key: &[u8]) -> ReadFuture<Option<Vec<u8>>> {
        let mut state = self.state.lock();
        self.record_read(&mut state, KeyRange::single(key));
        let result = match state.writes.get(key) {
            Some(write) => Ok(write.clone()),
            None if state.is_cleared(key) => Ok(None),
            None => self.store.get(key, self.read_version),
        };
        ReadFuture::ready(result)
    }

    fn get_key(&self, selector: &KeySelector) -> ReadFuture<Vec<u8>> {
        let mut state = self.state.lock();
        let search = selector.search_range();
        let result = self
            .merged_rows(&state, &search, Some(1), false)
            .map(|rows| rows.into_iter().next().map(|kv| kv.key));
        let result = match result {
            Ok(Some(key)) => {
                let mut end = key.clone();
                end.push(0x00);
                self.record_read(&mut state, KeyRange::new(search.begin, end));
                Ok(key)
            }
            Ok(None) => {
                self.record_read(&mut state, search);
                Ok(END_KEY.to_vec())
            }
            Err(e) => Err(e),
        };
        ReadFuture::ready(result)
    }

    fn get_range(&self, range: &KeyRange, options: RangeOptions) -> RangeResult {
        let mut state = self.state.lock();
        self.record_read(&mut state, range.clone());
        match self.merged_rows(&state, range, options.limit, options.reverse) {
            Ok(rows) => RangeResult::new(rows.into_iter().map(Ok)),
            Err(e) => RangeResult::failed(e),
        }
    }
}

impl Transaction for TransactionContext {
    fn set(&self, key: &[u8], value: &[u8]) {
        let mut state = self.state.lock();
        state.write_ranges.push(KeyRange::single(key));
        state.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn clear(&self, key: &[u8]) {
        let mut state = self.state.lock();
        state.write_ranges.push(KeyRange::single(key));
        state.writes.insert(key.to_vec(), None);
    }

    fn clear_range(&self, range: &KeyRange) {
        if range.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        let buffered: Vec<Vec<u8>> = state
            .writes
            .range::<[u8], _>((
                Bound::Included(range.begin.as_slice()),
                Bound::Excluded(range.end.as_slice()),
            ))
            .map(|(k, _)| k.clone())
            .collect();
        for key in buffered {
            state.writes.remove(&key);
        }
        state.write_ranges.push(range.clone());
        state.cleared.push(range.clone());
    }

    fn as_read(&self) -> &dyn ReadTransaction {
        self
    }
}
