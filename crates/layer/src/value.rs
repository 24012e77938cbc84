//! Lazily materialized record data
//!
//! A [`Value`] holds either an already decoded field map or a deferred
//! fetch. The fetch runs at most once, on first access, and its outcome
//! (including an error) is memoized for every later access.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::warn;

use stored_core::{Element, KeyValue, Result, Subspace};

use crate::codec::FieldValue;
use crate::record::Record;
use crate::schema::Schema;

type Fetch = Box<dyn FnOnce() -> Result<FieldMap> + Send>;

// ============================================================================
// FieldMap
// ============================================================================

/// Decoded field values keyed by field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    values: BTreeMap<String, FieldValue>,
}

impl FieldMap {
    /// Decode raw bytes per field name, skipping unknown names
    pub fn from_raw<I>(schema: &Schema, raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut values = BTreeMap::new();
        for (name, bytes) in raw {
            let Some(field) = schema.field(&name) else {
                continue;
            };
            values.insert(name, field.decode(&bytes)?);
        }
        Ok(Self { values })
    }

    /// Decode rows stored under `namespace`
    ///
    /// The first element of each key tuple names the field. Rows whose key
    /// does not decode or does not name a known field are logged and skipped.
    pub fn from_rows(schema: &Schema, namespace: &Subspace, rows: &[KeyValue]) -> Result<Self> {
        let mut values = BTreeMap::new();
        for row in rows {
            let key = match namespace.unpack(&row.key) {
                Ok(key) => key,
                Err(e) => {
                    warn!(object = schema.name(), error = %e, "skipping row with invalid key");
                    continue;
                }
            };
            let name = match key.get(0) {
                Some(Element::String(name)) => name,
                _ => {
                    warn!(object = schema.name(), key = %key, "skipping row without field name");
                    continue;
                }
            };
            let Some(field) = schema.field(name) else {
                warn!(object = schema.name(), field = %name, "skipping unknown field");
                continue;
            };
            values.insert(name.clone(), field.decode(&row.value)?);
        }
        Ok(Self { values })
    }

    /// Value of a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Iterate `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no field was decoded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Value
// ============================================================================

/// Record data, decoded or pending a one-shot fetch
pub struct Value {
    schema: Arc<Schema>,
    fetch: Mutex<Option<Fetch>>,
    resolved: OnceCell<Result<FieldMap>>,
}

impl Value {
    /// Value whose fields are already known
    pub fn resolved(schema: Arc<Schema>, fields: Result<FieldMap>) -> Self {
        Self {
            schema,
            fetch: Mutex::new(None),
            resolved: OnceCell::with_value(fields),
        }
    }

    /// Value decoded from raw bytes per field name
    pub fn from_raw_map<I>(schema: Arc<Schema>, raw: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let fields = FieldMap::from_raw(&schema, raw);
        Self::resolved(schema, fields)
    }

    /// Value decoded from rows stored under `namespace`
    pub fn from_range_rows(schema: Arc<Schema>, namespace: &Subspace, rows: &[KeyValue]) -> Self {
        let fields = FieldMap::from_rows(&schema, namespace, rows);
        Self::resolved(schema, fields)
    }

    /// Value resolved by `fetch` on first access
    pub fn deferred(
        schema: Arc<Schema>,
        fetch: impl FnOnce() -> Result<FieldMap> + Send + 'static,
    ) -> Self {
        Self {
            schema,
            fetch: Mutex::new(Some(Box::new(fetch))),
            resolved: OnceCell::new(),
        }
    }

    /// Schema interpreting this value
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Decoded fields, running the fetch if still pending
    pub fn fields(&self) -> Result<&FieldMap> {
        self.resolve().as_ref().map_err(Clone::clone)
    }

    /// Decoded value of one field
    pub fn get(&self, name: &str) -> Result<Option<&FieldValue>> {
        Ok(self.fields()?.get(name))
    }

    /// Run the fetch if pending and report its error, if any
    pub fn err(&self) -> Result<()> {
        self.fields().map(|_| ())
    }

    /// Copy every decoded field into `target`
    ///
    /// Fields the target refuses are logged and skipped.
    pub fn scan_into(&self, target: &mut dyn Record) -> Result<()> {
        let fields = self.fields()?;
        for (name, value) in fields.iter() {
            if let Err(e) = target.set_field(name, value.clone()) {
                warn!(object = self.schema.name(), field = name, error = %e, "could not set field");
            }
        }
        Ok(())
    }

    /// New instance of the schema's record type populated from this value
    pub fn materialize_new(&self) -> Result<Box<dyn Record>> {
        let mut record = self.schema.new_record();
        self.scan_into(record.as_mut())?;
        Ok(record)
    }

    /// Populate a fresh `T`
    pub fn materialize<T: Record + Default>(&self) -> Result<T> {
        let mut record = T::default();
        self.scan_into(&mut record)?;
        Ok(record)
    }

    /// Materialized record in type-erased form
    pub fn as_interface(&self) -> Result<Box<dyn Any + Send>> {
        Ok(self.materialize_new()?.into_any())
    }

    fn resolve(&self) -> &Result<FieldMap> {
        self.resolved.get_or_init(|| match self.fetch.lock().take() {
            Some(fetch) => fetch(),
            None => Ok(FieldMap::default()),
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("object", &self.schema.name())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}
