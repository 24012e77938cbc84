//! Store contract traits
//!
//! The object layer never talks to a concrete store. It consumes these
//! traits, which describe a transactional, ordered key-value store with
//! optimistic concurrency control:
//!
//! - point get, range read with bound/limit/reverse, key-successor selection
//! - point set, point clear, range clear
//! - an automatically retried read-write transaction wrapper
//! - a read-only snapshot transaction wrapper
//!
//! Thread safety: transaction handles use interior mutability and are shared
//! by reference between the steps of one attempt. A handle is never shared
//! between concurrent attempts.

use crate::error::Result;
use crate::future::{RangeResult, ReadFuture};
use crate::range::{KeyRange, KeySelector, RangeOptions};

/// Reads available inside any transaction
pub trait ReadTransaction: Send + Sync {
    /// Version at which this transaction reads
    fn read_version(&self) -> u64;

    /// Issue a point read
    ///
    /// Resolves to `None` when the key is absent.
    fn get(&self, key: &[u8]) -> ReadFuture<Option<Vec<u8>>>;

    /// Resolve a key selector to a concrete key
    ///
    /// Resolves to [`END_KEY`](crate::range::END_KEY) when no key matches.
    fn get_key(&self, selector: &KeySelector) -> ReadFuture<Vec<u8>>;

    /// Issue a range read
    fn get_range(&self, range: &KeyRange, options: RangeOptions) -> RangeResult;
}

/// Reads and writes inside a read-write transaction
///
/// Writes are buffered and become visible to other transactions only when
/// the enclosing [`Database::transact`] attempt commits.
pub trait Transaction: ReadTransaction {
    /// Write a value
    fn set(&self, key: &[u8], value: &[u8]);

    /// Remove a single key
    fn clear(&self, key: &[u8]);

    /// Remove every key in `[range.begin, range.end)`
    fn clear_range(&self, range: &KeyRange);

    /// View this transaction through its read-only interface
    fn as_read(&self) -> &dyn ReadTransaction;
}

/// A handle to a transactional store
///
/// Shared read-only by every operation; each attempt receives an exclusive
/// transaction handle.
pub trait Database: Send + Sync {
    /// Run `f` in a read-write transaction and commit it
    ///
    /// `f` may be invoked several times: an attempt that fails with a
    /// retryable error (see [`StoredError::is_retryable`]) is discarded and
    /// `f` runs again against a fresh transaction. A non-retryable error
    /// returned by `f` aborts the transaction without committing.
    ///
    /// [`StoredError::is_retryable`]: crate::error::StoredError::is_retryable
    fn transact(&self, f: &mut dyn FnMut(&dyn Transaction) -> Result<()>) -> Result<()>;

    /// Run `f` against a read-only snapshot
    ///
    /// Snapshot reads record no conflicts. Retried only on retryable errors.
    fn read_transact(&self, f: &mut dyn FnMut(&dyn ReadTransaction) -> Result<()>) -> Result<()>;
}
