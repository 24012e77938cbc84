//! Concurrency layer for stored
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: read-your-writes overlay, read/write conflict ranges
//! - Snapshot transactions (conflict-free reads)
//! - Conflict detection at commit time against a bounded commit history
//! - MemoryDatabase: the retrying [`Database`](stored_core::Database) backend
//! - DatabaseConfig / RetryConfig: TOML-loadable settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod conflict;
pub mod database;
pub mod manager;
pub mod transaction;

pub use config::{DatabaseConfig, RetryConfig};
pub use conflict::{CommitHistory, ConflictType};
pub use database::MemoryDatabase;
pub use manager::TransactionManager;
pub use transaction::{PendingOperations, TransactionContext, TransactionStatus, WriteSet};
