//! Object fields

use std::fmt;
use std::sync::Arc;

use stored_core::Result;

use crate::codec::{Codec, FieldKind, FieldValue, KindCodec};

/// One attribute of an object
///
/// Fields are created by [`ObjectBuilder`](crate::ObjectBuilder) and never
/// change after the object is built. `num` is the field's position in
/// declaration order.
#[derive(Clone)]
pub struct Field {
    name: String,
    num: usize,
    kind: FieldKind,
    codec: Arc<dyn Codec>,
}

impl Field {
    pub(crate) fn new(
        name: impl Into<String>,
        num: usize,
        kind: FieldKind,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            name: name.into(),
            num,
            kind,
            codec,
        }
    }

    pub(crate) fn with_kind(name: impl Into<String>, num: usize, kind: FieldKind) -> Self {
        Self::new(name, num, kind, Arc::new(KindCodec::new(kind)))
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position within the owning object
    pub fn num(&self) -> usize {
        self.num
    }

    /// Declared kind
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Encode a value with this field's codec
    pub fn encode(&self, value: &FieldValue) -> Result<Vec<u8>> {
        self.codec.encode(value)
    }

    /// Decode stored bytes with this field's codec
    pub fn decode(&self, bytes: &[u8]) -> Result<FieldValue> {
        self.codec.decode(bytes)
    }

    /// Whether `value` is empty and therefore not indexed
    pub fn is_empty(&self, value: &FieldValue) -> bool {
        self.codec.is_empty(value)
    }

    /// Whether the kind can serve as a geo coordinate
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, FieldKind::Int64 | FieldKind::Float64)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("num", &self.num)
            .field("kind", &self.kind)
            .finish()
    }
}
