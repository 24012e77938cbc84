//! Storage layer for stored
//!
//! This crate implements the committed-state backend used by the in-memory
//! transactional store:
//! - MemoryStore: BTreeMap-based multi-version storage with RwLock
//! - VersionChain: per-key history with tombstones
//! - Retained floor: bounded history with `TransactionTooOld` below it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod memory;

pub use chain::VersionChain;
pub use memory::{MemoryStore, PointWrite};
