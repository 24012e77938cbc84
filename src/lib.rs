//! stored - object mapping with secondary indexes over a transactional
//! ordered key-value store
//!
//! Records are registered as objects with a primary key and any number of
//! unique, non-unique, geohash or custom indexes. Every record operation
//! returns a [`Promise`]; running it drives a retry-safe chain of steps
//! inside one store transaction. Promises can be joined so that several
//! operations commit or abort together.
//!
//! # Quick Start
//!
//! ```
//! use stored::{tuple, Directory, FieldKind, MemoryDatabase, Row};
//!
//! let dir = Directory::new(MemoryDatabase::shared(), "app");
//! let accounts = dir
//!     .dynamic("account")
//!     .field("id", FieldKind::Int64)
//!     .field("owner", FieldKind::String)
//!     .field("balance", FieldKind::Int64)
//!     .primary(&["id"])
//!     .index("by_owner", "owner")
//!     .build()?;
//!
//! accounts.add(Row::new().with("id", 1i64).with("owner", "ann").with("balance", 10i64)).err()?;
//! let balance = accounts.increment(tuple![1i64], "balance", 5).int64()?;
//! assert_eq!(balance, 15);
//! # Ok::<(), stored::StoredError>(())
//! ```
//!
//! # Architecture
//!
//! - `stored-core`: tuple keys, subspaces, the store contract traits
//! - `stored-storage`: multi-version in-memory ordered store
//! - `stored-concurrency`: optimistic transactions and the retrying database
//! - `stored-layer`: objects, indexes, values and promises

pub use stored_concurrency::{DatabaseConfig, MemoryDatabase, RetryConfig};
pub use stored_core::{
    tuple, Database, Element, KeyRange, KeySelector, KeyValue, RangeOptions, ReadTransaction,
    Result, StoredError, StreamingMode, Subspace, Transaction, Tuple,
};
pub use stored_layer::*;
