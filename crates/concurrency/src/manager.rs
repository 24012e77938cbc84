//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins over read conflict ranges)
//! 2. Storage application (visibility, one commit version per transaction)
//! 3. History recording (write ranges for later validations)
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. take_write_set()       - Drain buffered writes and conflict ranges
//! 2. IF read-only: mark committed, return without a version
//! 3. lock commit history
//! 4. history.check()        - Conflict with any newer overlapping commit?
//! 5. IF conflict: abort and return retryable error
//! 6. store.apply()          - Apply clears then sets at the next version
//! 7. history.record()       - Publish write ranges, maybe raise the floor
//! 8. Return Ok(Some(commit_version))
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use stored_core::{ReadTransaction, Result, StoredError};
use stored_storage::MemoryStore;

use crate::conflict::CommitHistory;
use crate::transaction::TransactionContext;

/// Manages transaction lifecycle and atomic commits
///
/// The commit lock serializes validation and application, so validation
/// always runs against the complete set of earlier commits.
#[derive(Debug)]
pub struct TransactionManager {
    store: Arc<MemoryStore>,
    history: Mutex<CommitHistory>,
    history_limit: u64,
    /// Next transaction ID
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    /// Create a manager over `store` retaining `history_limit` commits
    pub fn new(store: Arc<MemoryStore>, history_limit: usize) -> Self {
        Self {
            store,
            history: Mutex::new(CommitHistory::new(history_limit)),
            history_limit: history_limit.max(1) as u64,
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.store.current_version()
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Begin a read-write transaction
    pub fn begin(&self) -> TransactionContext {
        TransactionContext::new(self.next_txn_id(), Arc::clone(&self.store))
    }

    /// Begin a snapshot transaction
    pub fn begin_snapshot(&self) -> TransactionContext {
        TransactionContext::snapshot(self.next_txn_id(), Arc::clone(&self.store))
    }

    /// Commit a transaction atomically
    ///
    /// # Returns
    /// - `Ok(Some(commit_version))` when writes were applied
    /// - `Ok(None)` for a read-only transaction
    /// - `Err(Conflict | TransactionTooOld)` when validation fails
    pub fn commit(&self, txn: &TransactionContext) -> Result<Option<u64>> {
        let write_set = txn.take_write_set();
        if write_set.is_read_only() {
            txn.mark_committed();
            return Ok(None);
        }

        let mut history = self.history.lock();
        if let Err(conflict) = history.check(txn.read_version(), &write_set.reads) {
            let err: StoredError = conflict.into();
            txn.mark_aborted(err.to_string());
            debug!(txn_id = txn.txn_id, error = %err, "commit rejected");
            return Err(err);
        }

        let version = self.store.apply(&write_set.cleared, &write_set.writes);
        if let Some(floor) = history.record(version, write_set.write_ranges) {
            // Pruning walks the whole keyspace, so do it once per history window
            if floor >= self.store.floor() + self.history_limit {
                self.store.advance_floor(floor);
            }
        }
        txn.mark_committed();
        trace!(
            txn_id = txn.txn_id,
            commit_version = version,
            writes = write_set.writes.len(),
            range_clears = write_set.cleared.len(),
            "committed"
        );
        Ok(Some(version))
    }
}
