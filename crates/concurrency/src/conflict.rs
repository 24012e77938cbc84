//! Conflict detection for optimistic transactions
//!
//! A transaction conflicts if any commit newer than its read version wrote a
//! key range that intersects one of the transaction's read ranges.
//!
//! # Rules
//!
//! - First-committer-wins, based on READ ranges, not write ranges
//! - Blind writes (write without read) do NOT conflict
//! - Snapshot reads record no ranges and never conflict
//! - A read version older than the retained history cannot be validated and
//!   fails with `TransactionTooOld`

use std::collections::VecDeque;

use stored_core::{KeyRange, StoredError};

/// A conflict found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A read range overlaps a newer commit's write range
    ReadWriteConflict {
        /// The read range of the validating transaction
        read: KeyRange,
        /// Version of the commit that wrote into it
        commit_version: u64,
    },
    /// The history needed to validate has been discarded
    TooOld {
        /// Read version of the validating transaction
        read_version: u64,
        /// Oldest version covered by the history
        floor: u64,
    },
}

impl From<ConflictType> for StoredError {
    fn from(conflict: ConflictType) -> Self {
        match conflict {
            ConflictType::ReadWriteConflict {
                read,
                commit_version,
            } => StoredError::Conflict(format!(
                "read range {:?}..{:?} written by commit {}",
                read.begin, read.end, commit_version
            )),
            ConflictType::TooOld {
                read_version,
                floor,
            } => StoredError::TransactionTooOld {
                read_version,
                floor,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct CommitRecord {
    version: u64,
    writes: Vec<KeyRange>,
}

/// Bounded log of recent commits' write ranges
#[derive(Debug)]
pub struct CommitHistory {
    records: VecDeque<CommitRecord>,
    limit: usize,
    floor: u64,
}

impl CommitHistory {
    /// Create a history retaining at most `limit` commits
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit.min(4096)),
            limit: limit.max(1),
            floor: 0,
        }
    }

    /// Oldest read version that can still be validated
    pub fn floor(&self) -> u64 {
        self.floor
    }

    /// Number of retained commits
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no commits are retained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate a transaction's read ranges against newer commits
    ///
    /// # Errors
    ///
    /// Returns the first conflict found.
    pub fn check(&self, read_version: u64, reads: &[KeyRange]) -> Result<(), ConflictType> {
        if read_version < self.floor {
            return Err(ConflictType::TooOld {
                read_version,
                floor: self.floor,
            });
        }
        for record in self.records.iter().rev() {
            if record.version <= read_version {
                break;
            }
            for read in reads {
                if record.writes.iter().any(|w| w.intersects(read)) {
                    return Err(ConflictType::ReadWriteConflict {
                        read: read.clone(),
                        commit_version: record.version,
                    });
                }
            }
        }
        Ok(())
    }

    /// Record a commit's write ranges
    ///
    /// # Returns
    ///
    /// `Some(new_floor)` when the oldest record was evicted.
    pub fn record(&mut self, version: u64, writes: Vec<KeyRange>) -> Option<u64> {
        self.records.push_back(CommitRecord { version, writes });
        if self.records.len() > self.limit {
            if let Some(evicted) = self.records.pop_front() {
                self.floor = evicted.version;
                return Some(self.floor);
            }
        }
        None
    }
}
