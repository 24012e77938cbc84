//! Field values and their binary codecs
//!
//! Every field of an object has a [`FieldKind`] and a [`Codec`] turning a
//! [`FieldValue`] of that kind into stored bytes and back. The default
//! [`KindCodec`] uses fixed-width little-endian numbers and raw UTF-8.

use byteorder::{ByteOrder, LittleEndian};

use stored_core::{Element, Result, StoredError};

/// Type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Boolean
    Bool,
    /// Signed 64-bit integer
    Int64,
    /// 64-bit float
    Float64,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
}

impl FieldKind {
    /// Kind name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int64 => "int64",
            FieldKind::Float64 => "float64",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
        }
    }

    /// Zero value of this kind
    pub fn zero(&self) -> FieldValue {
        match self {
            FieldKind::Bool => FieldValue::Bool(false),
            FieldKind::Int64 => FieldValue::Int64(0),
            FieldKind::Float64 => FieldValue::Float64(0.0),
            FieldKind::String => FieldValue::String(String::new()),
            FieldKind::Bytes => FieldValue::Bytes(Vec::new()),
        }
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int64(i64),
    /// 64-bit float
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Int64(_) => FieldKind::Int64,
            FieldValue::Float64(_) => FieldKind::Float64,
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Bytes(_) => FieldKind::Bytes,
        }
    }

    /// Numeric view, for geo coordinates
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float64(x) => Some(*x),
            FieldValue::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Integer view
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// String view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tuple element used in keys
    pub fn to_element(&self) -> Element {
        match self {
            FieldValue::Bool(b) => Element::Bool(*b),
            FieldValue::Int64(n) => Element::Int(*n),
            FieldValue::Float64(x) => Element::Float(*x),
            FieldValue::String(s) => Element::String(s.clone()),
            FieldValue::Bytes(b) => Element::Bytes(b.clone()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int64(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float64(x)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<FieldValue> for Element {
    fn from(value: FieldValue) -> Self {
        value.to_element()
    }
}

/// Encodes one attribute to binary form and back
pub trait Codec: Send + Sync {
    /// Encode a value for storage
    fn encode(&self, value: &FieldValue) -> Result<Vec<u8>>;

    /// Decode stored bytes
    fn decode(&self, bytes: &[u8]) -> Result<FieldValue>;

    /// Whether the value counts as empty (un-indexed)
    fn is_empty(&self, value: &FieldValue) -> bool;
}

/// Default codec for a field kind
#[derive(Debug, Clone, Copy)]
pub struct KindCodec {
    kind: FieldKind,
}

impl KindCodec {
    /// Codec for `kind`
    pub fn new(kind: FieldKind) -> Self {
        Self { kind }
    }

    fn mismatch(&self, value: &FieldValue) -> StoredError {
        StoredError::WrongValueKind {
            expected: self.kind.name(),
            found: value.kind().name(),
        }
    }
}

impl Codec for KindCodec {
    fn encode(&self, value: &FieldValue) -> Result<Vec<u8>> {
        if value.kind() != self.kind {
            return Err(self.mismatch(value));
        }
        Ok(match value {
            FieldValue::Bool(b) => vec![u8::from(*b)],
            FieldValue::Int64(n) => {
                let mut buf = vec![0u8; 8];
                LittleEndian::write_i64(&mut buf, *n);
                buf
            }
            FieldValue::Float64(x) => {
                let mut buf = vec![0u8; 8];
                LittleEndian::write_f64(&mut buf, *x);
                buf
            }
            FieldValue::String(s) => s.as_bytes().to_vec(),
            FieldValue::Bytes(b) => b.clone(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<FieldValue> {
        let fixed = |len: usize| {
            if bytes.len() == len {
                Ok(())
            } else {
                Err(StoredError::decode(format!(
                    "{} field needs {} bytes, got {}",
                    self.kind.name(),
                    len,
                    bytes.len()
                )))
            }
        };
        match self.kind {
            FieldKind::Bool => {
                fixed(1)?;
                Ok(FieldValue::Bool(bytes[0] != 0))
            }
            FieldKind::Int64 => {
                fixed(8)?;
                Ok(FieldValue::Int64(LittleEndian::read_i64(bytes)))
            }
            FieldKind::Float64 => {
                fixed(8)?;
                Ok(FieldValue::Float64(LittleEndian::read_f64(bytes)))
            }
            FieldKind::String => String::from_utf8(bytes.to_vec())
                .map(FieldValue::String)
                .map_err(|e| StoredError::decode(format!("invalid utf-8: {}", e))),
            FieldKind::Bytes => Ok(FieldValue::Bytes(bytes.to_vec())),
        }
    }

    fn is_empty(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Bool(b) => !b,
            FieldValue::Int64(n) => *n == 0,
            FieldValue::Float64(x) => *x == 0.0,
            FieldValue::String(s) => s.is_empty(),
            FieldValue::Bytes(b) => b.is_empty(),
        }
    }
}
