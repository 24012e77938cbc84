//! Promise / Chain continuation engine
//!
//! A [`Promise`] wraps the first step of a chain and the database it runs
//! against. Nothing runs until a terminal accessor (`err`, `scan`, `bool`,
//! `int64`, `value`, `values`, `scan_all`) consumes the promise. The
//! accessor opens a transaction and drives the chain:
//!
//! ```text
//! attempt := fresh Attempt (no error, no response)
//! next    := first(attempt)
//! while next is Some(step):
//!     next := step(attempt)
//! settle: error -> abort (retried by the store when retryable)
//!         ok    -> commit, hand the response to the accessor
//! ```
//!
//! The loop never recurses, so chains of any length run in constant stack.
//! When the store retries the transaction, the closure runs again with a
//! fresh [`Attempt`], so nothing from an aborted attempt reaches the result.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use stored_core::{Database, ReadTransaction, Result, StoredError, Transaction};

use crate::parallel::Parallel;
use crate::record::Record;
use crate::value::Value;

/// Unwrap a `Result` inside a chain step, failing the attempt on error
macro_rules! step_try {
    ($attempt:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => return $attempt.fail(err),
        }
    };
}
pub(crate) use step_try;

// ============================================================================
// Chain / Attempt
// ============================================================================

/// One step of a chain
///
/// Running a step yields the next step, or `None` when the chain is done.
pub struct Chain(Box<dyn FnOnce(&mut Attempt<'_>) -> Option<Chain> + Send>);

impl Chain {
    /// Wrap a step closure
    pub fn new(step: impl FnOnce(&mut Attempt<'_>) -> Option<Chain> + Send + 'static) -> Self {
        Chain(Box::new(step))
    }

    pub(crate) fn run(self, attempt: &mut Attempt<'_>) -> Option<Chain> {
        (self.0)(attempt)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chain")
    }
}

/// Re-invocable first step of a promise
pub(crate) type Start = Arc<dyn Fn(&mut Attempt<'_>) -> Option<Chain> + Send + Sync>;

/// State of one promise within one transaction attempt
pub struct Attempt<'t> {
    read: &'t dyn ReadTransaction,
    write: Option<&'t dyn Transaction>,
    error: Option<StoredError>,
    response: Option<Response>,
}

impl<'t> Attempt<'t> {
    pub(crate) fn writable(tr: &'t dyn Transaction) -> Self {
        Self {
            read: tr.as_read(),
            write: Some(tr),
            error: None,
            response: None,
        }
    }

    pub(crate) fn read_only(tr: &'t dyn ReadTransaction) -> Self {
        Self {
            read: tr,
            write: None,
            error: None,
            response: None,
        }
    }

    /// Read access to the attempt's transaction
    pub fn read(&self) -> &'t dyn ReadTransaction {
        self.read
    }

    /// Write access to the attempt's transaction
    ///
    /// # Errors
    ///
    /// `StoredError::ReadOnly` inside a read-only promise.
    pub fn write(&self) -> Result<&'t dyn Transaction> {
        self.write.ok_or(StoredError::ReadOnly)
    }

    /// Settle with an error
    pub fn fail(&mut self, err: StoredError) -> Option<Chain> {
        self.error = Some(err);
        None
    }

    /// Settle with a response
    pub fn done(&mut self, response: Response) -> Option<Chain> {
        self.response = Some(response);
        None
    }

    /// Settle without a response
    pub fn ok(&mut self) -> Option<Chain> {
        None
    }

    pub(crate) fn error(&self) -> Option<&StoredError> {
        self.error.as_ref()
    }

    pub(crate) fn settle(self) -> Result<Option<Response>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.response),
        }
    }
}

/// Run a chain to its terminal step
pub(crate) fn drive(start: &Start, attempt: &mut Attempt<'_>) {
    let mut next = start(attempt);
    while let Some(step) = next {
        next = step.run(attempt);
    }
}

// ============================================================================
// Response
// ============================================================================

/// Outcome payload of a settled promise
#[derive(Debug)]
pub enum Response {
    /// Boolean answer
    Bool(bool),
    /// Integer answer
    Int64(i64),
    /// One record
    Value(Value),
    /// Several records
    Values(Vec<Value>),
}

impl Response {
    fn kind_name(&self) -> &'static str {
        match self {
            Response::Bool(_) => "bool",
            Response::Int64(_) => "int64",
            Response::Value(_) => "value",
            Response::Values(_) => "values",
        }
    }

    fn mismatch(&self, expected: &'static str) -> StoredError {
        StoredError::WrongValueKind {
            expected,
            found: self.kind_name(),
        }
    }
}

// ============================================================================
// Promise
// ============================================================================

/// One-shot handle to a transactional operation
pub struct Promise {
    pub(crate) db: Arc<dyn Database>,
    pub(crate) start: Start,
    read_only: bool,
}

impl Promise {
    /// Promise running `first` in a read-write transaction
    pub fn write(
        db: Arc<dyn Database>,
        first: impl Fn(&mut Attempt<'_>) -> Option<Chain> + Send + Sync + 'static,
    ) -> Self {
        Self {
            db,
            start: Arc::new(first),
            read_only: false,
        }
    }

    /// Promise running `first` against a read-only snapshot
    pub fn read(
        db: Arc<dyn Database>,
        first: impl Fn(&mut Attempt<'_>) -> Option<Chain> + Send + Sync + 'static,
    ) -> Self {
        Self {
            db,
            start: Arc::new(first),
            read_only: true,
        }
    }

    /// Promise that settles with `err` without touching the store
    pub fn failed(db: Arc<dyn Database>, err: StoredError) -> Self {
        Self::read(db, move |attempt| attempt.fail(err.clone()))
    }

    /// Whether the promise runs in a snapshot transaction
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn transact(&self) -> Result<Option<Response>> {
        let mut settled = None;
        let mut round = 0usize;
        if self.read_only {
            self.db.read_transact(&mut |tr| {
                round += 1;
                settled = None;
                debug!(attempt = round, read_only = true, "running promise");
                let mut attempt = Attempt::read_only(tr);
                drive(&self.start, &mut attempt);
                settled = attempt.settle()?;
                Ok(())
            })?;
        } else {
            self.db.transact(&mut |tr| {
                round += 1;
                settled = None;
                debug!(attempt = round, read_only = false, "running promise");
                let mut attempt = Attempt::writable(tr);
                drive(&self.start, &mut attempt);
                settled = attempt.settle()?;
                Ok(())
            })?;
        }
        Ok(settled)
    }

    /// Execute for side effects and return the outcome error
    pub fn err(self) -> Result<()> {
        self.transact().map(|_| ())
    }

    /// Execute and copy the resulting record into `target`
    ///
    /// # Panics
    ///
    /// When the operation does not produce a Value.
    pub fn scan(self, target: &mut dyn Record) -> Result<()> {
        self.value()?.scan_into(target)
    }

    /// Execute and return the resulting Value
    ///
    /// # Panics
    ///
    /// When the operation does not produce a Value.
    pub fn value(self) -> Result<Value> {
        match self.transact()? {
            Some(Response::Value(value)) => Ok(value),
            _ => panic!("Scan couldn't be triggered because promise has no Value"),
        }
    }

    /// Execute and return the boolean response
    ///
    /// # Panics
    ///
    /// When the operation produces no response.
    pub fn bool(self) -> Result<bool> {
        match self.response()? {
            Response::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    /// Execute and return the integer response
    ///
    /// # Panics
    ///
    /// When the operation produces no response.
    pub fn int64(self) -> Result<i64> {
        match self.response()? {
            Response::Int64(n) => Ok(n),
            other => Err(other.mismatch("int64")),
        }
    }

    /// Execute and return the list of Values
    ///
    /// # Panics
    ///
    /// When the operation produces no response.
    pub fn values(self) -> Result<Vec<Value>> {
        match self.response()? {
            Response::Values(values) => Ok(values),
            other => Err(other.mismatch("values")),
        }
    }

    /// Execute and materialize every listed record as `T`
    ///
    /// # Panics
    ///
    /// When the operation produces no response.
    pub fn scan_all<T: Record + Default>(self) -> Result<Vec<T>> {
        self.values()?.iter().map(|v| v.materialize::<T>()).collect()
    }

    fn response(self) -> Result<Response> {
        match self.transact()? {
            Some(response) => Ok(response),
            None => panic!("promise does not contain any value, use Scan"),
        }
    }

    /// Run this promise and `other` in one transaction
    pub fn join(self, other: Promise) -> Parallel {
        let db = Arc::clone(&self.db);
        Parallel::new(db, vec![self, other])
    }

    /// Run this promise and one built by `builder` in one transaction
    ///
    /// `builder` is called inside each attempt, after this promise's first
    /// step has run.
    pub fn join_do(self, builder: impl Fn() -> Promise + Send + Sync + 'static) -> Parallel {
        let db = Arc::clone(&self.db);
        Parallel::new(db, vec![self]).join_do(builder)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stored_concurrency::{DatabaseConfig, MemoryDatabase};

    fn db() -> Arc<dyn Database> {
        let config = DatabaseConfig {
            base_delay_ms: 0,
            max_delay_ms: 0,
            ..DatabaseConfig::default()
        };
        Arc::new(MemoryDatabase::with_config(&config))
    }

    #[test]
    fn test_long_chain_runs_in_a_loop() {
        fn countdown(n: u64) -> Option<Chain> {
            Some(Chain::new(move |attempt| {
                if n == 0 {
                    attempt.done(Response::Int64(-1))
                } else {
                    countdown(n - 1)
                }
            }))
        }
        let p = Promise::read(db(), |_| countdown(200_000));
        assert_eq!(p.int64().unwrap(), -1);
    }

    #[test]
    fn test_steps_run_in_order() {
        let p = Promise::write(db(), |attempt| {
            step_try!(attempt, attempt.write()).set(b"k", b"1");
            Some(Chain::new(|attempt| {
                let seen = step_try!(attempt, attempt.read().get(b"k").wait());
                attempt.done(Response::Bool(seen.as_deref() == Some(b"1".as_slice())))
            }))
        });
        assert!(p.bool().unwrap());
    }

    #[test]
    fn test_fail_aborts_writes() {
        let db = db();
        let p = Promise::write(Arc::clone(&db), |attempt| {
            step_try!(attempt, attempt.write()).set(b"k", b"1");
            attempt.fail(StoredError::validation("nope"))
        });
        assert!(matches!(p.err(), Err(StoredError::Validation(_))));

        let check = Promise::read(db, |attempt| {
            let v = step_try!(attempt, attempt.read().get(b"k").wait());
            attempt.done(Response::Bool(v.is_some()))
        });
        assert!(!check.bool().unwrap());
    }

    #[test]
    fn test_read_only_promise_cannot_write() {
        let p = Promise::read(db(), |attempt| {
            step_try!(attempt, attempt.write());
            attempt.ok()
        });
        assert_eq!(p.err(), Err(StoredError::ReadOnly));
    }

    #[test]
    fn test_wrong_kind_is_an_error() {
        let p = Promise::read(db(), |attempt| attempt.done(Response::Bool(true)));
        assert_eq!(
            p.int64(),
            Err(StoredError::WrongValueKind {
                expected: "int64",
                found: "bool"
            })
        );
    }

    #[test]
    #[should_panic(expected = "use Scan")]
    fn test_scalar_accessor_without_response_panics() {
        let p = Promise::read(db(), |attempt| attempt.ok());
        let _ = p.bool();
    }

    #[test]
    #[should_panic(expected = "promise has no Value")]
    fn test_scan_without_value_panics() {
        let p = Promise::read(db(), |attempt| attempt.done(Response::Int64(1)));
        let mut row = crate::record::Row::new();
        let _ = p.scan(&mut row);
    }

    #[test]
    fn test_retry_starts_from_clean_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let p = Promise::write(db(), move |attempt| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                attempt.done(Response::Bool(true));
                return attempt.fail(StoredError::Conflict("forced".into()));
            }
            Some(Chain::new(|attempt| attempt.done(Response::Int64(2))))
        });
        assert_eq!(p.int64().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_promise() {
        let p = Promise::failed(db(), StoredError::NotFound);
        assert!(p.is_read_only());
        assert_eq!(p.err(), Err(StoredError::NotFound));
    }
}
