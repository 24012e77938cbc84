//! Secondary indexes
//!
//! An index derives a key tuple from a record and maintains entries under
//! its own namespace:
//!
//! ```text
//! unique:     (index space, key...)          -> packed primary tuple
//! non-unique: (index space, key..., pk...)   -> empty
//! ```
//!
//! Key derivation is selected once, when the index is built, and is a pure
//! function of the record's field values. A record whose derived key is
//! absent (empty field, zero coordinates, empty custom key) is not indexed.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use stored_core::{
    Database, Element, KeySelector, RangeOptions, RangeResult, ReadTransaction, Result,
    StoredError, Subspace, Transaction, Tuple,
};

use crate::geo;
use crate::promise::{step_try, Promise};
use crate::query::Query;
use crate::record::{Record, RecordRef};
use crate::schema::Schema;
use crate::value::Value;

/// User-supplied key function for custom indexes
///
/// Returning `None` or an empty key leaves the record un-indexed.
pub type CustomKey = Arc<dyn Fn(&RecordRef<'_>) -> Option<Vec<u8>> + Send + Sync>;

/// How an index derives its key from a record
#[derive(Clone)]
pub enum KeyDerivation {
    /// The value of one field (by position)
    Field(usize),
    /// Geohash of two numeric fields, truncated to `precision` characters
    Geo {
        /// Latitude field position
        lat: usize,
        /// Longitude field position
        lng: usize,
        /// Hash length, 1..=12
        precision: usize,
    },
    /// An external key function
    Custom(CustomKey),
}

impl fmt::Debug for KeyDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDerivation::Field(num) => f.debug_tuple("Field").field(num).finish(),
            KeyDerivation::Geo {
                lat,
                lng,
                precision,
            } => f
                .debug_struct("Geo")
                .field("lat", lat)
                .field("lng", lng)
                .field("precision", precision)
                .finish(),
            KeyDerivation::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Acknowledgment required by [`Index::reindex_unsafe`]
///
/// Reindexing writes entries without removing the ones derived from earlier
/// field values, so stale entries may remain.
#[derive(Debug)]
pub struct Maintenance {
    _private: (),
}

impl Maintenance {
    /// Acknowledge that reindexing may leave stale entries
    pub fn acknowledged() -> Self {
        Self { _private: () }
    }
}

/// One secondary index of an object
pub struct Index {
    name: String,
    unique: bool,
    derivation: KeyDerivation,
    parent: Subspace,
    space: OnceCell<Subspace>,
    schema: Arc<Schema>,
    db: Arc<dyn Database>,
}

impl Index {
    pub(crate) fn new(
        name: String,
        unique: bool,
        derivation: KeyDerivation,
        schema: Arc<Schema>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            name,
            unique,
            derivation,
            parent: schema.space().sub_element("index"),
            space: OnceCell::new(),
            schema,
            db,
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether one key maps to at most one record
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Key derivation mode
    pub fn derivation(&self) -> &KeyDerivation {
        &self.derivation
    }

    /// Namespace of this index's entries, created on first use
    pub fn space(&self) -> &Subspace {
        self.space
            .get_or_init(|| self.parent.sub_element(self.name.as_str()))
    }

    // ========================================================================
    // Key derivation
    // ========================================================================

    /// Index key of `record`, `None` when the record is not indexed
    pub fn derive_key(&self, record: &RecordRef<'_>) -> Result<Option<Tuple>> {
        match &self.derivation {
            KeyDerivation::Field(num) => {
                let field = &self.schema.fields()[*num];
                let value = record.value(field);
                if field.is_empty(&value) {
                    return Ok(None);
                }
                Ok(Some(Tuple::from(value.to_element())))
            }
            KeyDerivation::Geo {
                lat,
                lng,
                precision,
            } => {
                let lat = self.coordinate(record, *lat)?;
                let lng = self.coordinate(record, *lng)?;
                if lat == 0.0 && lng == 0.0 {
                    return Ok(None);
                }
                let hash = geo::encode(lat, lng, *precision)?;
                Ok(Some(Tuple::from(Element::String(hash))))
            }
            KeyDerivation::Custom(key_fn) => match key_fn(record) {
                Some(bytes) if !bytes.is_empty() => Ok(Some(Tuple::from(Element::Bytes(bytes)))),
                _ => Ok(None),
            },
        }
    }

    fn coordinate(&self, record: &RecordRef<'_>, num: usize) -> Result<f64> {
        let field = &self.schema.fields()[num];
        let value = record.value(field);
        value.as_f64().ok_or(StoredError::WrongValueKind {
            expected: "float64",
            found: value.kind().name(),
        })
    }

    // ========================================================================
    // Maintenance of entries
    // ========================================================================

    /// Write the entry of `new`, replacing the entry derived from `old`
    ///
    /// Equal old and new keys (both absent included) leave the index
    /// untouched. For a unique index the existing occupant is read, the new
    /// entry is written, and only then is the read awaited.
    ///
    /// # Errors
    ///
    /// `StoredError::AlreadyExist` when a unique key belongs to another record.
    pub fn write(
        &self,
        tr: &dyn Transaction,
        primary: &Tuple,
        new: &RecordRef<'_>,
        old: Option<&RecordRef<'_>>,
    ) -> Result<()> {
        let key = self.derive_key(new)?;
        if let Some(old) = old {
            let stale = self.derive_key(old)?;
            if stale.as_ref().map(Tuple::pack) == key.as_ref().map(Tuple::pack) {
                return Ok(());
            }
            self.delete(tr, primary, stale.as_ref());
        }
        let Some(key) = key else {
            return Ok(());
        };

        if self.unique {
            let slot = self.space().pack(&key);
            let packed = primary.pack();
            let previous = tr.get(&slot);
            tr.set(&slot, &packed);
            match previous.wait()? {
                Some(owner) if !owner.is_empty() && owner != packed => {
                    trace!(index = %self.name, key = %key, "unique key taken");
                    Err(StoredError::AlreadyExist)
                }
                _ => Ok(()),
            }
        } else {
            let mut full = key;
            full.extend(primary);
            tr.set(&self.space().pack(&full), &[]);
            Ok(())
        }
    }

    /// Remove the entry for `key`; absent keys are a no-op
    pub fn delete(&self, tr: &dyn Transaction, primary: &Tuple, key: Option<&Tuple>) {
        let Some(key) = key else {
            return;
        };
        if self.unique {
            tr.clear(&self.space().pack(key));
        } else {
            let mut full = key.clone();
            full.extend(primary);
            tr.clear_range(&self.space().sub(&full).range_inclusive());
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Scan a non-unique index, yielding a deferred Value per entry
    ///
    /// # Panics
    ///
    /// When called on a unique index.
    pub fn list<'t>(&self, tr: &'t dyn ReadTransaction, query: &Query) -> IndexScan<'t> {
        if self.unique {
            panic!("index '{}' is unique (lists not supported)", self.name);
        }
        let namespace = self.space().sub(&query.values);
        let mut range = namespace.range();
        if let Some(from) = &query.from {
            if query.reverse {
                range.end = namespace.pack(from);
            } else {
                range.begin = namespace.pack(from);
            }
        }
        let options = RangeOptions::want_all()
            .with_limit(query.limit)
            .with_reverse(query.reverse);
        IndexScan {
            tr,
            rows: tr.get_range(&range, options),
            namespace,
            schema: Arc::clone(&self.schema),
            finished: false,
        }
    }

    /// Namespace of the row whose indexed value is `value`
    ///
    /// For a non-unique index this is the first matching record in key order.
    ///
    /// # Errors
    ///
    /// `StoredError::NotFound` when no record carries `value`.
    pub fn lookup_primary(&self, tr: &dyn ReadTransaction, value: &Element) -> Result<Subspace> {
        let sub = self.space().sub_element(value.clone());
        if self.unique {
            let bytes = tr.get(sub.bytes()).wait()?.unwrap_or_default();
            if bytes.is_empty() {
                return Err(StoredError::NotFound);
            }
            let primary = Tuple::unpack(&bytes)?;
            return Ok(self.schema.row(&primary));
        }

        let found = tr
            .get_key(&KeySelector::first_greater_than(sub.bytes()))
            .wait()?;
        let primary = sub
            .unpack(&found)
            .ok()
            .and_then(|rest| rest.suffix(self.schema.primary_len()))
            .filter(|pk| !pk.is_empty())
            .ok_or(StoredError::NotFound)?;
        Ok(self.schema.row(&primary))
    }

    /// Write the entry of `record` without removing earlier entries
    ///
    /// Entries derived from the record's previous field values are left in
    /// place. Intended for rebuilding an index, never for routine writes.
    pub fn reindex_unsafe(self: &Arc<Self>, _ack: Maintenance, record: impl Record) -> Promise {
        let index = Arc::clone(self);
        Promise::write(Arc::clone(&self.db), move |attempt| {
            let tr = step_try!(attempt, attempt.write());
            let rec = RecordRef::new(&index.schema, &record);
            let primary = step_try!(attempt, rec.primary());
            step_try!(attempt, index.write(tr, &primary, &rec, None));
            attempt.ok()
        })
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("derivation", &self.derivation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// IndexScan
// ============================================================================

/// Lazy entries of an index range scan
///
/// Each item is the deferred Value of one listed record. The scan stops
/// after its first error.
pub struct IndexScan<'t> {
    tr: &'t dyn ReadTransaction,
    rows: RangeResult,
    namespace: Subspace,
    schema: Arc<Schema>,
    finished: bool,
}

impl IndexScan<'_> {
    fn next_primary(&mut self) -> Option<Result<Tuple>> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        let full = match self.namespace.unpack(&row.key) {
            Ok(full) => full,
            Err(e) => return Some(Err(e)),
        };
        Some(
            full.suffix(self.schema.primary_len())
                .ok_or_else(|| StoredError::decode("invalid data: key too short")),
        )
    }
}

impl Iterator for IndexScan<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_primary()? {
            Ok(primary) => Some(Ok(self.schema.need(self.tr, self.schema.row(&primary)))),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl fmt::Debug for IndexScan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexScan")
            .field("object", &self.schema.name())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
