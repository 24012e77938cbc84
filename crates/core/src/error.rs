//! Error types for stored
//!
//! This module defines the single error type used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Retry classification
//!
//! Only store-detected optimistic concurrency failures are retryable
//! (`Conflict`, `TransactionTooOld`). Everything else, including a unique
//! index collision (`AlreadyExist`), is terminal for the transaction.

use thiserror::Error;

/// Result type alias for stored operations
pub type Result<T> = std::result::Result<T, StoredError>;

/// Error types for the stored layer and its store backends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoredError {
    /// A unique index already holds a different primary key for this value,
    /// or a record with the same primary key already exists
    #[error("object already exists")]
    AlreadyExist,

    /// Lookup miss: no row, no unique index entry, or no matching index key
    #[error("object not found")]
    NotFound,

    /// Stored key or value could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Transaction aborted because a concurrent commit touched its read set
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Read version is older than the retained commit history
    #[error("transaction too old: read version {read_version} below retained floor {floor}")]
    TransactionTooOld {
        /// Read version of the failed transaction
        read_version: u64,
        /// Oldest version still covered by conflict history
        floor: u64,
    },

    /// Write attempted through a read-only handle
    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    /// A promise or field held a value of a different kind than requested
    #[error("wrong value kind: expected {expected}, found {found}")]
    WrongValueKind {
        /// Kind the caller asked for
        expected: &'static str,
        /// Kind actually held
        found: &'static str,
    },

    /// Application-level validation rejected the operation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid argument or schema definition
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoredError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        StoredError::Decode(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        StoredError::InvalidInput(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        StoredError::Validation(msg.into())
    }

    /// Whether the transaction wrapper should retry the attempt
    ///
    /// True only for optimistic concurrency failures detected by the store.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoredError::Conflict(_) | StoredError::TransactionTooOld { .. }
        )
    }
}
