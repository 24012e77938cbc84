//! Record access
//!
//! A [`Record`] is the static accessor table of one object type: it reads
//! and writes fields by name, with no runtime type introspection. [`Row`] is
//! a dynamic record usable with any schema. [`RecordRef`] pairs a record with
//! the schema that interprets it.

use std::any::Any;
use std::collections::BTreeMap;

use stored_core::{Result, StoredError, Tuple};

use crate::codec::FieldValue;
use crate::field::Field;
use crate::schema::Schema;

/// Conversion to `Any` for type-erased records
pub trait AsAny {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Convert a boxed record into a boxed `Any`
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Field accessors of a record type
///
/// # Example
///
/// ```
/// use stored_layer::{FieldValue, Record};
/// use stored_core::{Result, StoredError};
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     email: String,
/// }
///
/// impl Record for User {
///     fn get_field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "id" => Some(self.id.into()),
///             "email" => Some(self.email.clone().into()),
///             _ => None,
///         }
///     }
///
///     fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
///         match (name, value) {
///             ("id", FieldValue::Int64(v)) => self.id = v,
///             ("email", FieldValue::String(v)) => self.email = v,
///             (other, _) => return Err(StoredError::invalid_input(other)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Record: AsAny + Send + Sync + 'static {
    /// Current value of a field, `None` when the record has no such field
    fn get_field(&self, name: &str) -> Option<FieldValue>;

    /// Overwrite a field
    ///
    /// An error means the field cannot be written; loaders skip it.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()>;
}

/// Dynamic record: a field map accepted by every schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, FieldValue>,
}

impl Row {
    /// Empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Assign a field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Number of assigned fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is assigned
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Record for Row {
    fn get_field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        self.fields.insert(name.to_string(), value);
        Ok(())
    }
}

/// A record paired with its schema
#[derive(Clone, Copy)]
pub struct RecordRef<'a> {
    schema: &'a Schema,
    record: &'a dyn Record,
}

impl<'a> RecordRef<'a> {
    /// Interpret `record` through `schema`
    pub fn new(schema: &'a Schema, record: &'a dyn Record) -> Self {
        Self { schema, record }
    }

    /// The schema
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The underlying record
    pub fn record(&self) -> &'a dyn Record {
        self.record
    }

    /// Value of a declared field; unset fields read as the kind's zero
    pub fn value(&self, field: &Field) -> FieldValue {
        self.record
            .get_field(field.name())
            .unwrap_or_else(|| field.kind().zero())
    }

    /// Value of a field by name
    pub fn get(&self, name: &str) -> Result<FieldValue> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| StoredError::invalid_input(format!("unknown field '{}'", name)))?;
        Ok(self.value(field))
    }

    /// Primary key tuple, in declared primary-field order
    pub fn primary(&self) -> Result<Tuple> {
        let mut tuple = Tuple::new();
        for field in self.schema.primary_fields() {
            let value = self.value(field);
            if value.kind() != field.kind() {
                return Err(StoredError::WrongValueKind {
                    expected: field.kind().name(),
                    found: value.kind().name(),
                });
            }
            tuple.push(value.to_element());
        }
        Ok(tuple)
    }

    /// Every field encoded with its codec, in declaration order
    pub fn raw_fields(&self) -> Result<Vec<(&'a Field, Vec<u8>)>> {
        self.schema
            .fields()
            .iter()
            .map(|field| Ok((field, field.encode(&self.value(field))?)))
            .collect()
    }
}

impl std::fmt::Debug for RecordRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRef")
            .field("object", &self.schema.name())
            .finish_non_exhaustive()
    }
}
