//! Atomic composition of promises
//!
//! A [`Parallel`] runs several promises inside one read-write transaction.
//! Either every write of every promise commits, or the whole group aborts
//! (and is retried together when the store says so).
//!
//! Execution of one attempt:
//! 1. the first step of every joined promise
//! 2. deferred builders, each producing a promise whose first step runs next
//! 3. round-robin over the remaining chains until all are done
//!
//! The first settled error aborts the attempt. No ordering between the steps
//! of different promises is promised beyond this schedule.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use stored_core::{Database, Result};

use crate::promise::{Attempt, Chain, Promise};

type Builder = Box<dyn Fn() -> Promise + Send + Sync>;

/// Group of promises committed as one transaction
pub struct Parallel {
    db: Arc<dyn Database>,
    promises: Vec<Promise>,
    builders: Vec<Builder>,
}

impl Parallel {
    pub(crate) fn new(db: Arc<dyn Database>, promises: Vec<Promise>) -> Self {
        Self {
            db,
            promises,
            builders: Vec::new(),
        }
    }

    /// Add another promise to the group
    pub fn join(mut self, promise: Promise) -> Self {
        self.promises.push(promise);
        self
    }

    /// Add a promise built inside each attempt, after the first steps ran
    pub fn join_do(mut self, builder: impl Fn() -> Promise + Send + Sync + 'static) -> Self {
        self.builders.push(Box::new(builder));
        self
    }

    /// Number of grouped promises, deferred ones included
    pub fn len(&self) -> usize {
        self.promises.len() + self.builders.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute the group and return the first error
    pub fn err(self) -> Result<()> {
        let mut round = 0usize;
        self.db.transact(&mut |tr| {
            round += 1;
            debug!(
                attempt = round,
                promises = self.promises.len(),
                deferred = self.builders.len(),
                "running parallel"
            );

            let mut attempts = Vec::with_capacity(self.len());
            let mut chains: Vec<Option<Chain>> = Vec::with_capacity(self.len());
            for promise in &self.promises {
                let mut attempt = Attempt::writable(tr);
                chains.push((promise.start)(&mut attempt));
                attempts.push(attempt);
            }
            first_error(&attempts)?;

            for builder in &self.builders {
                let promise = builder();
                let mut attempt = Attempt::writable(tr);
                chains.push((promise.start)(&mut attempt));
                attempts.push(attempt);
            }
            first_error(&attempts)?;

            let mut pending = chains.iter().any(Option::is_some);
            while pending {
                pending = false;
                for (chain, attempt) in chains.iter_mut().zip(attempts.iter_mut()) {
                    if let Some(step) = chain.take() {
                        *chain = step.run(attempt);
                        pending = true;
                    }
                }
                first_error(&attempts)?;
            }
            Ok(())
        })
    }
}

fn first_error(attempts: &[Attempt<'_>]) -> Result<()> {
    match attempts.iter().find_map(|a| a.error()) {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

impl fmt::Debug for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parallel")
            .field("promises", &self.promises.len())
            .field("deferred", &self.builders.len())
            .finish()
    }
}
