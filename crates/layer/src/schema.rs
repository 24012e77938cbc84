//! Object schema: the per-object field table
//!
//! A schema is built once by [`ObjectBuilder`](crate::ObjectBuilder) and is
//! immutable afterwards. It maps field names to [`Field`]s, knows which
//! fields form the primary key and owns the object's primary namespace.
//!
//! ## Key layout
//!
//! ```text
//! (root, object, "primary", pk..., field_name) -> encoded field value
//! (root, object, "index", index_name, ...)     -> index entries
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use stored_core::{RangeOptions, ReadTransaction, StoredError, Subspace, Tuple};

use crate::field::Field;
use crate::record::Record;
use crate::value::{FieldMap, Value};

pub(crate) type Factory = Arc<dyn Fn() -> Box<dyn Record> + Send + Sync>;

/// Field registry and namespaces of one object
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    by_name: FxHashMap<String, usize>,
    primary: Vec<usize>,
    space: Subspace,
    primary_space: OnceCell<Subspace>,
    factory: Factory,
}

impl Schema {
    pub(crate) fn new(
        name: String,
        fields: Vec<Field>,
        primary: Vec<usize>,
        space: Subspace,
        factory: Factory,
    ) -> Self {
        let by_name = fields
            .iter()
            .map(|f| (f.name().to_string(), f.num()))
            .collect();
        Self {
            name,
            fields,
            by_name,
            primary,
            space,
            primary_space: OnceCell::new(),
            factory,
        }
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_name.get(name).map(|&num| &self.fields[num])
    }

    /// Primary-key fields in key order
    pub fn primary_fields(&self) -> impl Iterator<Item = &Field> {
        self.primary.iter().map(move |&num| &self.fields[num])
    }

    /// Number of primary-key fields
    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    /// Root namespace of this object
    pub fn space(&self) -> &Subspace {
        &self.space
    }

    /// Namespace holding primary rows
    pub fn primary_space(&self) -> &Subspace {
        self.primary_space
            .get_or_init(|| self.space.sub_element("primary"))
    }

    /// Namespace of the row identified by `primary`
    pub fn row(&self, primary: &Tuple) -> Subspace {
        self.primary_space().sub(primary)
    }

    /// Fresh, empty instance of the object's record type
    pub fn new_record(&self) -> Box<dyn Record> {
        (self.factory)()
    }

    /// Issue a read of a whole row and return its deferred Value
    ///
    /// The range read is issued immediately. Decoding happens on first
    /// access; a row with no stored fields resolves to `NotFound`.
    pub fn need(self: &Arc<Self>, tr: &dyn ReadTransaction, row: Subspace) -> Value {
        let rows = tr.get_range(&row.range(), RangeOptions::want_all());
        let schema = Arc::clone(self);
        Value::deferred(Arc::clone(self), move || {
            let rows = rows.collect_rows()?;
            if rows.is_empty() {
                return Err(StoredError::NotFound);
            }
            FieldMap::from_rows(&schema, &row, &rows)
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        space: Subspace,
        fields: &[(&str, crate::codec::FieldKind)],
        primary: &[&str],
    ) -> Self {
        let fields: Vec<Field> = fields
            .iter()
            .enumerate()
            .map(|(num, (name, kind))| Field::with_kind(*name, num, *kind))
            .collect();
        let primary = primary
            .iter()
            .filter_map(|p| fields.iter().position(|f| f.name() == *p))
            .collect();
        Self::new(
            "test".to_string(),
            fields,
            primary,
            space,
            Arc::new(|| Box::new(crate::record::Row::new())),
        )
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("primary", &self.primary)
            .finish_non_exhaustive()
    }
}
