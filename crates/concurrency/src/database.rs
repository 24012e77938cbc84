//! In-memory transactional database
//!
//! `MemoryDatabase` implements the [`Database`] store contract over a
//! [`MemoryStore`], with automatic retry on conflict.
//!
//! The closure passed to [`Database::transact`] is called repeatedly until
//! either:
//! - The transaction commits successfully
//! - A non-retryable error occurs (not retried, nothing committed)
//! - Maximum retries are exceeded (the last retryable error is returned)

use std::sync::Arc;

use tracing::{debug, warn};

use stored_core::{Database, ReadTransaction, Result, StoredError, Transaction};
use stored_storage::MemoryStore;

use crate::config::{DatabaseConfig, RetryConfig};
use crate::manager::TransactionManager;

/// Transactional in-memory database
#[derive(Debug)]
pub struct MemoryDatabase {
    manager: TransactionManager,
    retry: RetryConfig,
}

impl MemoryDatabase {
    /// Create an empty database with default configuration
    pub fn new() -> Self {
        Self::with_config(&DatabaseConfig::default())
    }

    /// Create an empty database with `config`
    pub fn with_config(config: &DatabaseConfig) -> Self {
        Self {
            manager: TransactionManager::new(Arc::new(MemoryStore::new()), config.history_limit),
            retry: config.retry(),
        }
    }

    /// Shared handle suitable for the object layer
    pub fn shared() -> Arc<dyn Database> {
        Arc::new(Self::new())
    }

    /// Retry policy in effect
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Newest committed version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Underlying committed-state store
    pub fn store(&self) -> &Arc<MemoryStore> {
        self.manager.store()
    }

    fn backoff(&self, attempt: usize, err: &StoredError) {
        let delay = self.retry.calculate_delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying transaction");
        std::thread::sleep(delay);
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for MemoryDatabase {
    fn transact(&self, f: &mut dyn FnMut(&dyn Transaction) -> Result<()>) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            let txn = self.manager.begin();
            let outcome = match f(&txn) {
                Ok(()) => self.manager.commit(&txn).map(|_| ()),
                Err(e) => {
                    txn.mark_aborted(format!("closure error: {}", e));
                    Err(e)
                }
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    self.backoff(attempt, &e);
                    last_error = Some(e);
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(attempts = attempt + 1, error = %e, "transaction retries exhausted");
                    }
                    return Err(e);
                }
            }
        }

        // The loop always returns on its final iteration
        Err(last_error.unwrap_or_else(|| {
            StoredError::Storage("retry loop exited without a result".to_string())
        }))
    }

    fn read_transact(&self, f: &mut dyn FnMut(&dyn ReadTransaction) -> Result<()>) -> Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            let txn = self.manager.begin_snapshot();
            match f(&txn) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    self.backoff(attempt, &e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            StoredError::Storage("retry loop exited without a result".to_string())
        }))
    }
}
