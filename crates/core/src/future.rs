//! Read handles returned by store reads
//!
//! A read is *issued* when the transaction method is called and *awaited*
//! when the caller invokes [`ReadFuture::wait`]. Callers may issue writes
//! between the two; the read still reflects the state at issue time.

use crate::error::Result;
use crate::range::KeyValue;

type Resolve<T> = Box<dyn FnOnce() -> Result<T> + Send>;

/// Handle to an issued, not yet awaited read
pub struct ReadFuture<T> {
    resolve: Resolve<T>,
}

impl<T: Send + 'static> ReadFuture<T> {
    /// Future that is already resolved
    pub fn ready(result: Result<T>) -> Self {
        Self {
            resolve: Box::new(move || result),
        }
    }

    /// Future resolved by a deferred closure on first wait
    pub fn deferred(resolve: impl FnOnce() -> Result<T> + Send + 'static) -> Self {
        Self {
            resolve: Box::new(resolve),
        }
    }

    /// Block until the read completes
    pub fn wait(self) -> Result<T> {
        (self.resolve)()
    }
}

impl<T> std::fmt::Debug for ReadFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadFuture").finish_non_exhaustive()
    }
}

/// Rows of an issued range read, yielded lazily
pub struct RangeResult {
    rows: Box<dyn Iterator<Item = Result<KeyValue>> + Send>,
}

impl RangeResult {
    /// Wrap an iterator of rows
    pub fn new(rows: impl Iterator<Item = Result<KeyValue>> + Send + 'static) -> Self {
        Self {
            rows: Box::new(rows),
        }
    }

    /// Range read that failed before producing rows
    pub fn failed(err: crate::error::StoredError) -> Self {
        Self::new(std::iter::once(Err(err)))
    }

    /// Drain all rows, stopping at the first error
    pub fn collect_rows(self) -> Result<Vec<KeyValue>> {
        self.rows.collect()
    }
}

impl Iterator for RangeResult {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl std::fmt::Debug for RangeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeResult").finish_non_exhaustive()
    }
}
