//! Core types and traits for stored
//!
//! This crate defines the foundational types used throughout the system:
//! - Tuple / Element: order-preserving key encoding
//! - Subspace: tuple-prefixed key namespaces
//! - KeyRange / KeySelector / RangeOptions: range read vocabulary
//! - ReadFuture / RangeResult: issued-but-not-awaited reads
//! - Traits: the store contract (ReadTransaction, Transaction, Database)
//! - StoredError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod future;
pub mod range;
pub mod subspace;
pub mod traits;
pub mod tuple;

pub use error::{Result, StoredError};
pub use future::{RangeResult, ReadFuture};
pub use range::{KeyRange, KeySelector, KeyValue, RangeOptions, StreamingMode, END_KEY};
pub use subspace::Subspace;
pub use traits::{Database, ReadTransaction, Transaction};
pub use tuple::{Element, Tuple};
