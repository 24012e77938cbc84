//! Object layer for stored
//!
//! Maps records onto a transactional ordered key-value store and keeps
//! secondary indexes consistent with them:
//! - Field / Codec: typed attributes and their stored form
//! - Schema / Record / Row: per-object field tables and record access
//! - Index: unique, non-unique, geohash and custom indexes
//! - Value: lazily decoded record data
//! - Promise / Chain / Parallel: retry-safe continuation engine
//! - Object / Directory: registration and record operations
//!
//! # Example
//!
//! ```
//! use stored_concurrency::MemoryDatabase;
//! use stored_layer::{Directory, FieldKind, Row};
//!
//! let dir = Directory::new(MemoryDatabase::shared(), "app");
//! let users = dir
//!     .dynamic("user")
//!     .field("id", FieldKind::Int64)
//!     .field("email", FieldKind::String)
//!     .primary(&["id"])
//!     .unique("by_email", "email")
//!     .build()
//!     .unwrap();
//!
//! users.add(Row::new().with("id", 1i64).with("email", "a@x.com")).err().unwrap();
//! let mut row = Row::new();
//! users.get_by("by_email", "a@x.com").scan(&mut row).unwrap();
//! assert_eq!(row.get("id").and_then(|v| v.as_i64()), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod field;
pub mod geo;
pub mod index;
pub mod object;
pub mod parallel;
pub mod promise;
pub mod query;
pub mod record;
pub mod schema;
pub mod value;

pub use codec::{Codec, FieldKind, FieldValue, KindCodec};
pub use field::Field;
pub use index::{CustomKey, Index, IndexScan, KeyDerivation, Maintenance};
pub use object::{Directory, Object, ObjectBuilder};
pub use parallel::Parallel;
pub use promise::{Attempt, Chain, Promise, Response};
pub use query::Query;
pub use record::{AsAny, Record, RecordRef, Row};
pub use schema::Schema;
pub use value::{FieldMap, Value};
