//! Objects: schema, indexes and record operations
//!
//! An [`Object`] is registered once through [`ObjectBuilder`] and then
//! serves record operations. Every operation returns a [`Promise`]; nothing
//! touches the store until a terminal accessor runs it.
//!
//! | Operation | Transaction | Response |
//! |-----------|-------------|----------|
//! | `add` | read-write | none, `AlreadyExist` on duplicate primary key |
//! | `set` | read-write | none |
//! | `get` / `get_by` | snapshot | Value |
//! | `exists` | snapshot | Bool |
//! | `delete` | read-write | none, `NotFound` when absent |
//! | `update` | read-write | none |
//! | `increment` | read-write | Int64 |
//! | `list` | snapshot | Values |

use std::fmt;
use std::sync::Arc;

use stored_core::{
    tuple, Database, Element, RangeOptions, Result, StoredError, Subspace, Transaction, Tuple,
};

use crate::codec::{Codec, FieldKind};
use crate::field::Field;
use crate::geo::MAX_PRECISION;
use crate::index::{CustomKey, Index, KeyDerivation};
use crate::promise::{step_try, Chain, Promise, Response};
use crate::query::Query;
use crate::record::{Record, RecordRef, Row};
use crate::schema::{Factory, Schema};
use crate::value::Value;

// ============================================================================
// Directory
// ============================================================================

/// Root namespace under which objects are registered
#[derive(Clone)]
pub struct Directory {
    db: Arc<dyn Database>,
    root: Subspace,
}

impl Directory {
    /// Directory rooted at `(root)`
    pub fn new(db: Arc<dyn Database>, root: &str) -> Self {
        Self {
            db,
            root: Subspace::from_tuple(&tuple![root]),
        }
    }

    /// Root namespace
    pub fn root(&self) -> &Subspace {
        &self.root
    }

    /// Database handle shared by every object
    pub fn db(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Start registering an object backed by record type `T`
    pub fn object<T: Record + Default>(&self, name: &str) -> ObjectBuilder {
        ObjectBuilder::new(
            Arc::clone(&self.db),
            self.root.sub_element(name),
            name,
            Arc::new(|| Box::new(T::default())),
        )
    }

    /// Start registering an object backed by dynamic [`Row`]s
    pub fn dynamic(&self, name: &str) -> ObjectBuilder {
        self.object::<Row>(name)
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ObjectBuilder
// ============================================================================

enum IndexSource {
    Field(String),
    Geo {
        lat: String,
        lng: String,
        precision: usize,
    },
    Custom(CustomKey),
}

struct IndexSpec {
    name: String,
    unique: bool,
    source: IndexSource,
}

/// Registers the fields, primary key and indexes of an object
pub struct ObjectBuilder {
    db: Arc<dyn Database>,
    space: Subspace,
    name: String,
    fields: Vec<(String, FieldKind, Option<Arc<dyn Codec>>)>,
    primary: Vec<String>,
    indexes: Vec<IndexSpec>,
    factory: Factory,
}

impl ObjectBuilder {
    fn new(db: Arc<dyn Database>, space: Subspace, name: &str, factory: Factory) -> Self {
        Self {
            db,
            space,
            name: name.to_string(),
            fields: Vec::new(),
            primary: Vec::new(),
            indexes: Vec::new(),
            factory,
        }
    }

    /// Declare a field with the default codec of its kind
    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.push((name.to_string(), kind, None));
        self
    }

    /// Declare a field with a custom codec
    pub fn field_with_codec(mut self, name: &str, kind: FieldKind, codec: Arc<dyn Codec>) -> Self {
        self.fields.push((name.to_string(), kind, Some(codec)));
        self
    }

    /// Fields forming the primary key, in key order
    pub fn primary(mut self, fields: &[&str]) -> Self {
        self.primary = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Unique index on one field
    pub fn unique(self, name: &str, field: &str) -> Self {
        self.push_index(name, true, IndexSource::Field(field.to_string()))
    }

    /// Non-unique index on one field
    pub fn index(self, name: &str, field: &str) -> Self {
        self.push_index(name, false, IndexSource::Field(field.to_string()))
    }

    /// Non-unique geohash index over a latitude and a longitude field
    pub fn geo(self, name: &str, lat: &str, lng: &str, precision: usize) -> Self {
        self.push_index(
            name,
            false,
            IndexSource::Geo {
                lat: lat.to_string(),
                lng: lng.to_string(),
                precision,
            },
        )
    }

    /// Index keyed by a custom function
    pub fn custom(
        self,
        name: &str,
        unique: bool,
        key: impl Fn(&RecordRef<'_>) -> Option<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        self.push_index(name, unique, IndexSource::Custom(Arc::new(key)))
    }

    fn push_index(mut self, name: &str, unique: bool, source: IndexSource) -> Self {
        self.indexes.push(IndexSpec {
            name: name.to_string(),
            unique,
            source,
        });
        self
    }

    /// Validate the declaration and build the object
    ///
    /// # Errors
    ///
    /// `StoredError::InvalidInput` for duplicate or unknown names, a missing
    /// primary key, non-numeric geo fields or a geo precision outside 1..=12.
    pub fn build(self) -> Result<Object> {
        let invalid =
            |msg: String| StoredError::invalid_input(format!("object '{}': {}", self.name, msg));

        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        for (num, (name, kind, codec)) in self.fields.iter().enumerate() {
            if fields.iter().any(|f| f.name() == name.as_str()) {
                return Err(invalid(format!("duplicate field '{}'", name)));
            }
            fields.push(match codec {
                Some(codec) => Field::new(name.clone(), num, *kind, Arc::clone(codec)),
                None => Field::with_kind(name.clone(), num, *kind),
            });
        }
        let position = |name: &str| {
            fields
                .iter()
                .position(|f| f.name() == name)
                .ok_or_else(|| invalid(format!("unknown field '{}'", name)))
        };

        if self.primary.is_empty() {
            return Err(invalid("no primary key".to_string()));
        }
        let primary = self
            .primary
            .iter()
            .map(|name| position(name.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let mut derivations = Vec::with_capacity(self.indexes.len());
        for (i, spec) in self.indexes.iter().enumerate() {
            if self.indexes[..i].iter().any(|other| other.name == spec.name) {
                return Err(invalid(format!("duplicate index '{}'", spec.name)));
            }
            let derivation = match &spec.source {
                IndexSource::Field(field) => KeyDerivation::Field(position(field.as_str())?),
                IndexSource::Geo {
                    lat,
                    lng,
                    precision,
                } => {
                    let (lat, lng) = (position(lat.as_str())?, position(lng.as_str())?);
                    if !fields[lat].is_numeric() || !fields[lng].is_numeric() {
                        return Err(invalid(format!(
                            "geo index '{}' needs numeric fields",
                            spec.name
                        )));
                    }
                    if !(1..=MAX_PRECISION).contains(precision) {
                        return Err(invalid(format!(
                            "geo index '{}' precision {} outside 1..={}",
                            spec.name, precision, MAX_PRECISION
                        )));
                    }
                    KeyDerivation::Geo {
                        lat,
                        lng,
                        precision: *precision,
                    }
                }
                IndexSource::Custom(key) => KeyDerivation::Custom(Arc::clone(key)),
            };
            derivations.push((spec.name.clone(), spec.unique, derivation));
        }

        let schema = Arc::new(Schema::new(
            self.name.clone(),
            fields,
            primary,
            self.space.clone(),
            Arc::clone(&self.factory),
        ));
        let indexes = derivations
            .into_iter()
            .map(|(name, unique, derivation)| {
                Arc::new(Index::new(
                    name,
                    unique,
                    derivation,
                    Arc::clone(&schema),
                    Arc::clone(&self.db),
                ))
            })
            .collect();

        Ok(Object {
            inner: Arc::new(ObjectInner {
                schema,
                indexes,
                db: Arc::clone(&self.db),
            }),
        })
    }
}

// ============================================================================
// Object
// ============================================================================

struct ObjectInner {
    schema: Arc<Schema>,
    indexes: Vec<Arc<Index>>,
    db: Arc<dyn Database>,
}

/// A registered object type
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    /// Field registry and namespaces
    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// Object name
    pub fn name(&self) -> &str {
        self.inner.schema.name()
    }

    /// Index by name
    pub fn index(&self, name: &str) -> Option<&Arc<Index>> {
        self.inner.indexes.iter().find(|i| i.name() == name)
    }

    /// Every index, in declaration order
    pub fn indexes(&self) -> &[Arc<Index>] {
        &self.inner.indexes
    }

    fn db(&self) -> Arc<dyn Database> {
        Arc::clone(&self.inner.db)
    }

    fn unknown_index(&self, name: &str) -> Promise {
        Promise::failed(
            self.db(),
            StoredError::invalid_input(format!("object '{}' has no index '{}'", self.name(), name)),
        )
    }

    /// Write every field of `record` and update every index
    fn write_row(
        &self,
        tr: &dyn Transaction,
        record: &RecordRef<'_>,
        old: Option<&RecordRef<'_>>,
    ) -> Result<()> {
        let primary = record.primary()?;
        let row = self.inner.schema.row(&primary);
        for (field, bytes) in record.raw_fields()? {
            tr.set(&row.pack(&tuple![field.name()]), &bytes);
        }
        for index in &self.inner.indexes {
            index.write(tr, &primary, record, old)?;
        }
        Ok(())
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Insert a new record
    ///
    /// Settles with `AlreadyExist` when a record with the same primary key
    /// is stored, or when a unique index key is taken.
    pub fn add(&self, record: impl Record) -> Promise {
        let object = self.clone();
        let record = Arc::new(record);
        Promise::write(self.db(), move |attempt| {
            let schema = &object.inner.schema;
            let primary = step_try!(attempt, RecordRef::new(schema, record.as_ref()).primary());
            let probe = attempt.read().get_range(
                &schema.row(&primary).range(),
                RangeOptions::want_all().with_limit(Some(1)),
            );
            let object = object.clone();
            let record = Arc::clone(&record);
            Some(Chain::new(move |attempt| {
                let taken = step_try!(attempt, probe.collect_rows());
                if !taken.is_empty() {
                    return attempt.fail(StoredError::AlreadyExist);
                }
                let tr = step_try!(attempt, attempt.write());
                let rec = RecordRef::new(&object.inner.schema, record.as_ref());
                step_try!(attempt, object.write_row(tr, &rec, None));
                attempt.ok()
            }))
        })
    }

    /// Insert or overwrite a record, keeping indexes consistent
    pub fn set(&self, record: impl Record) -> Promise {
        let object = self.clone();
        let record = Arc::new(record);
        Promise::write(self.db(), move |attempt| {
            let schema = &object.inner.schema;
            let primary = step_try!(attempt, RecordRef::new(schema, record.as_ref()).primary());
            let previous = schema.need(attempt.read(), schema.row(&primary));
            let object = object.clone();
            let record = Arc::clone(&record);
            Some(Chain::new(move |attempt| {
                let old = match previous.materialize_new() {
                    Ok(old) => Some(old),
                    Err(StoredError::NotFound) => None,
                    Err(e) => return attempt.fail(e),
                };
                let tr = step_try!(attempt, attempt.write());
                let schema = &object.inner.schema;
                let rec = RecordRef::new(schema, record.as_ref());
                let old = old.as_deref().map(|old| RecordRef::new(schema, old));
                step_try!(attempt, object.write_row(tr, &rec, old.as_ref()));
                attempt.ok()
            }))
        })
    }

    /// Load the record stored under `primary`
    ///
    /// Settles with `NotFound` when absent.
    pub fn get(&self, primary: Tuple) -> Promise {
        let schema = Arc::clone(&self.inner.schema);
        Promise::read(self.db(), move |attempt| {
            let value = schema.need(attempt.read(), schema.row(&primary));
            settle_value(value)
        })
    }

    /// Load the record whose `index` key equals `value`
    pub fn get_by(&self, index: &str, value: impl Into<Element>) -> Promise {
        let Some(index) = self.index(index).cloned() else {
            return self.unknown_index(index);
        };
        let schema = Arc::clone(&self.inner.schema);
        let value = value.into();
        Promise::read(self.db(), move |attempt| {
            let row = step_try!(attempt, index.lookup_primary(attempt.read(), &value));
            let value = schema.need(attempt.read(), row);
            settle_value(value)
        })
    }

    /// Whether a record is stored under `primary`
    pub fn exists(&self, primary: Tuple) -> Promise {
        let schema = Arc::clone(&self.inner.schema);
        Promise::read(self.db(), move |attempt| {
            let rows = attempt.read().get_range(
                &schema.row(&primary).range(),
                RangeOptions::want_all().with_limit(Some(1)),
            );
            let rows = step_try!(attempt, rows.collect_rows());
            attempt.done(Response::Bool(!rows.is_empty()))
        })
    }

    /// Remove the record under `primary` together with its index entries
    ///
    /// Settles with `NotFound` when absent.
    pub fn delete(&self, primary: Tuple) -> Promise {
        let object = self.clone();
        Promise::write(self.db(), move |attempt| {
            let schema = &object.inner.schema;
            let row = schema.row(&primary);
            let previous = schema.need(attempt.read(), row.clone());
            let object = object.clone();
            let primary = primary.clone();
            Some(Chain::new(move |attempt| {
                let old = step_try!(attempt, previous.materialize_new());
                let tr = step_try!(attempt, attempt.write());
                let rec = RecordRef::new(&object.inner.schema, old.as_ref());
                for index in &object.inner.indexes {
                    let key = step_try!(attempt, index.derive_key(&rec));
                    index.delete(tr, &primary, key.as_ref());
                }
                tr.clear_range(&row.range());
                attempt.ok()
            }))
        })
    }

    /// Read-modify-write of the record under `primary`
    ///
    /// An error returned by `mutate` fails the operation and nothing is
    /// written. The primary key must not change.
    pub fn update<T, F>(&self, primary: Tuple, mutate: F) -> Promise
    where
        T: Record + Default,
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        let object = self.clone();
        let mutate = Arc::new(mutate);
        Promise::write(self.db(), move |attempt| {
            let schema = &object.inner.schema;
            let previous = schema.need(attempt.read(), schema.row(&primary));
            let object = object.clone();
            let primary = primary.clone();
            let mutate = Arc::clone(&mutate);
            Some(Chain::new(move |attempt| {
                let before: T = step_try!(attempt, previous.materialize());
                let mut after: T = step_try!(attempt, previous.materialize());
                step_try!(attempt, (*mutate)(&mut after));
                let tr = step_try!(attempt, attempt.write());
                step_try!(attempt, object.replace(tr, &primary, &before, &after));
                attempt.ok()
            }))
        })
    }

    /// Add `delta` to an `Int64` field and return the new value
    ///
    /// A missing stored value counts as zero.
    pub fn increment(&self, primary: Tuple, field: &str, delta: i64) -> Promise {
        match self.inner.schema.field(field) {
            Some(f) if f.kind() == FieldKind::Int64 => {}
            _ => {
                return Promise::failed(
                    self.db(),
                    StoredError::invalid_input(format!("'{}' is not an int64 field", field)),
                )
            }
        }
        let object = self.clone();
        let field = field.to_string();
        Promise::write(self.db(), move |attempt| {
            let schema = &object.inner.schema;
            let previous = schema.need(attempt.read(), schema.row(&primary));
            let object = object.clone();
            let primary = primary.clone();
            let field = field.clone();
            Some(Chain::new(move |attempt| {
                let before: Row = step_try!(attempt, previous.materialize());
                let current = before.get(&field).and_then(|v| v.as_i64()).unwrap_or(0);
                let Some(next) = current.checked_add(delta) else {
                    return attempt.fail(StoredError::invalid_input(format!(
                        "increment of '{}' overflows",
                        field
                    )));
                };
                let mut after = before.clone();
                after.set(field.as_str(), next);
                let tr = step_try!(attempt, attempt.write());
                step_try!(attempt, object.replace(tr, &primary, &before, &after));
                attempt.done(Response::Int64(next))
            }))
        })
    }

    /// List records through a non-unique index
    ///
    /// # Panics
    ///
    /// When `index` is unique.
    pub fn list(&self, index: &str, query: Query) -> Promise {
        let Some(index) = self.index(index).cloned() else {
            return self.unknown_index(index);
        };
        Promise::read(self.db(), move |attempt| {
            let values = index.list(attempt.read(), &query).collect::<Result<Vec<Value>>>();
            let values = step_try!(attempt, values);
            attempt.done(Response::Values(values))
        })
    }

    /// Write `after` over `before` unless the primary key changed
    fn replace(
        &self,
        tr: &dyn Transaction,
        primary: &Tuple,
        before: &dyn Record,
        after: &dyn Record,
    ) -> Result<()> {
        let schema = &self.inner.schema;
        let old = RecordRef::new(schema, before);
        let new = RecordRef::new(schema, after);
        if new.primary()?.pack() != primary.pack() {
            return Err(StoredError::invalid_input("update changed the primary key"));
        }
        self.write_row(tr, &new, Some(&old))
    }
}

/// Settle with `value` once its fetch has succeeded
fn settle_value(value: Value) -> Option<Chain> {
    Some(Chain::new(move |attempt| {
        step_try!(attempt, value.err());
        attempt.done(Response::Value(value))
    }))
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("schema", &self.inner.schema)
            .field("indexes", &self.inner.indexes)
            .finish()
    }
}
