//! Order-preserving tuple encoding
//!
//! Keys in the store are packed tuples. The encoding preserves ordering:
//! for two tuples `a < b` (element-wise, by type code then value) the packed
//! bytes compare the same way, so range scans over a tuple prefix visit keys
//! in tuple order.
//!
//! # Wire format
//!
//! ```text
//! Null    0x00
//! Bytes   0x01 <bytes, 0x00 escaped as 0x00 0xFF> 0x00
//! String  0x02 <utf-8, 0x00 escaped as 0x00 0xFF> 0x00
//! Int     0x0C..=0x1C  (0x14 = zero, 0x14 +/- n = n big-endian bytes,
//!                       negatives stored as one's complement)
//! Float   0x21 <8 bytes, sign-flipped big-endian IEEE 754>
//! False   0x26
//! True    0x27
//! ```

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use crate::error::{Result, StoredError};

const NULL_CODE: u8 = 0x00;
const BYTES_CODE: u8 = 0x01;
const STRING_CODE: u8 = 0x02;
const INT_ZERO_CODE: u8 = 0x14;
const FLOAT_CODE: u8 = 0x21;
const FALSE_CODE: u8 = 0x26;
const TRUE_CODE: u8 = 0x27;
const ESCAPE: u8 = 0xFF;

/// One element of a packed tuple
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Null marker
    Null,
    /// Raw byte string
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl Element {
    /// Human-readable type name, used in decode errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Null => "null",
            Element::Bytes(_) => "bytes",
            Element::String(_) => "string",
            Element::Int(_) => "int",
            Element::Float(_) => "float",
            Element::Bool(_) => "bool",
        }
    }

    /// Borrow as str if this is a string element
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            _ => None,
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Element::Null => out.push(NULL_CODE),
            Element::Bytes(b) => {
                out.push(BYTES_CODE);
                encode_escaped(b, out);
            }
            Element::String(s) => {
                out.push(STRING_CODE);
                encode_escaped(s.as_bytes(), out);
            }
            Element::Int(n) => encode_int(*n, out),
            Element::Float(f) => {
                out.push(FLOAT_CODE);
                let mut bits = f.to_bits();
                if bits & (1 << 63) != 0 {
                    bits = !bits;
                } else {
                    bits ^= 1 << 63;
                }
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, bits);
                out.extend_from_slice(&buf);
            }
            Element::Bool(false) => out.push(FALSE_CODE),
            Element::Bool(true) => out.push(TRUE_CODE),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Null => write!(f, "null"),
            Element::Bytes(b) => write!(f, "b{:?}", b),
            Element::String(s) => write!(f, "{:?}", s),
            Element::Int(n) => write!(f, "{}", n),
            Element::Float(x) => write!(f, "{}", x),
            Element::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Element {
    fn from(n: i64) -> Self {
        Element::Int(n)
    }
}

impl From<f64> for Element {
    fn from(x: f64) -> Self {
        Element::Float(x)
    }
}

impl From<bool> for Element {
    fn from(b: bool) -> Self {
        Element::Bool(b)
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::String(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::String(s)
    }
}

impl From<Vec<u8>> for Element {
    fn from(b: Vec<u8>) -> Self {
        Element::Bytes(b)
    }
}

impl From<&[u8]> for Element {
    fn from(b: &[u8]) -> Self {
        Element::Bytes(b.to_vec())
    }
}

/// An ordered sequence of elements
///
/// Equality is element-wise; two tuples that are equal always pack to the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple(Vec<Element>);

impl Tuple {
    /// Create an empty tuple
    pub fn new() -> Self {
        Tuple(Vec::new())
    }

    /// Append an element
    pub fn push(&mut self, element: impl Into<Element>) {
        self.0.push(element.into());
    }

    /// Builder-style append
    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.push(element);
        self
    }

    /// Concatenate another tuple onto this one
    pub fn extend(&mut self, other: &Tuple) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Element at position
    pub fn get(&self, index: usize) -> Option<&Element> {
        self.0.get(index)
    }

    /// Iterate elements
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.0.iter()
    }

    /// The trailing `n` elements as a new tuple
    ///
    /// Returns `None` when the tuple is shorter than `n`.
    pub fn suffix(&self, n: usize) -> Option<Tuple> {
        if self.0.len() < n {
            return None;
        }
        Some(Tuple(self.0[self.0.len() - n..].to_vec()))
    }

    /// Encode to ordered bytes
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * 9);
        self.pack_into(&mut out);
        out
    }

    /// Encode onto an existing buffer (used for prefixed keys)
    pub fn pack_into(&self, out: &mut Vec<u8>) {
        for element in &self.0 {
            element.encode_into(out);
        }
    }

    /// Decode a packed tuple
    ///
    /// # Errors
    ///
    /// Returns `StoredError::Decode` on unknown type codes, truncated input,
    /// invalid UTF-8 or out-of-range integers.
    pub fn unpack(bytes: &[u8]) -> Result<Tuple> {
        let mut elements = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let (element, next) = decode_element(bytes, pos)?;
            elements.push(element);
            pos = next;
        }
        Ok(Tuple(elements))
    }
}

impl From<Vec<Element>> for Tuple {
    fn from(elements: Vec<Element>) -> Self {
        Tuple(elements)
    }
}

impl From<Element> for Tuple {
    fn from(element: Element) -> Self {
        Tuple(vec![element])
    }
}

impl IntoIterator for Tuple {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", element)?;
        }
        write!(f, ")")
    }
}

/// Build a tuple from a list of convertible values
///
/// ```
/// use stored_core::tuple;
/// let t = tuple!["users", 42i64];
/// assert_eq!(t.len(), 2);
/// ```
#[macro_export]
macro_rules! tuple {
    () => { $crate::Tuple::new() };
    ($($e:expr),+ $(,)?) => {{
        let mut t = $crate::Tuple::new();
        $( t.push($e); )+
        t
    }};
}

fn encode_escaped(data: &[u8], out: &mut Vec<u8>) {
    for &b in data {
        out.push(b);
        if b == 0x00 {
            out.push(ESCAPE);
        }
    }
    out.push(0x00);
}

fn byte_len(n: u64) -> usize {
    ((64 - n.leading_zeros() as usize) + 7) / 8
}

fn mask(len: usize) -> u64 {
    if len >= 8 {
        u64::MAX
    } else {
        (1u64 << (len * 8)) - 1
    }
}

fn encode_int(n: i64, out: &mut Vec<u8>) {
    if n == 0 {
        out.push(INT_ZERO_CODE);
        return;
    }
    let abs = n.unsigned_abs();
    let len = byte_len(abs);
    let mut buf = [0u8; 8];
    if n > 0 {
        out.push(INT_ZERO_CODE + len as u8);
        BigEndian::write_uint(&mut buf, abs, len);
    } else {
        out.push(INT_ZERO_CODE - len as u8);
        BigEndian::write_uint(&mut buf, mask(len) - abs, len);
    }
    out.extend_from_slice(&buf[..len]);
}

fn decode_escaped(bytes: &[u8], mut pos: usize) -> Result<(Vec<u8>, usize)> {
    let mut data = Vec::new();
    loop {
        match bytes.get(pos) {
            None => return Err(StoredError::decode("unterminated byte string")),
            Some(0x00) => {
                if bytes.get(pos + 1) == Some(&ESCAPE) {
                    data.push(0x00);
                    pos += 2;
                } else {
                    return Ok((data, pos + 1));
                }
            }
            Some(&b) => {
                data.push(b);
                pos += 1;
            }
        }
    }
}

fn decode_element(bytes: &[u8], pos: usize) -> Result<(Element, usize)> {
    let code = bytes[pos];
    let body = pos + 1;
    match code {
        NULL_CODE => Ok((Element::Null, body)),
        BYTES_CODE => {
            let (data, next) = decode_escaped(bytes, body)?;
            Ok((Element::Bytes(data), next))
        }
        STRING_CODE => {
            let (data, next) = decode_escaped(bytes, body)?;
            let s = String::from_utf8(data)
                .map_err(|e| StoredError::decode(format!("invalid utf-8 in tuple: {}", e)))?;
            Ok((Element::String(s), next))
        }
        0x0C..=0x1C => {
            let positive = code >= INT_ZERO_CODE;
            let len = (code as i16 - INT_ZERO_CODE as i16).unsigned_abs() as usize;
            let end = body + len;
            if end > bytes.len() {
                return Err(StoredError::decode("truncated integer"));
            }
            if len == 0 {
                return Ok((Element::Int(0), end));
            }
            let raw = BigEndian::read_uint(&bytes[body..end], len);
            let value = if positive {
                i64::try_from(raw).map_err(|_| StoredError::decode("integer overflow"))?
            } else {
                let abs = mask(len) - raw;
                if abs == 1u64 << 63 {
                    i64::MIN
                } else {
                    let abs =
                        i64::try_from(abs).map_err(|_| StoredError::decode("integer overflow"))?;
                    -abs
                }
            };
            Ok((Element::Int(value), end))
        }
        FLOAT_CODE => {
            let end = body + 8;
            if end > bytes.len() {
                return Err(StoredError::decode("truncated float"));
            }
            let mut bits = BigEndian::read_u64(&bytes[body..end]);
            if bits & (1 << 63) != 0 {
                bits ^= 1 << 63;
            } else {
                bits = !bits;
            }
            Ok((Element::Float(f64::from_bits(bits)), end))
        }
        FALSE_CODE => Ok((Element::Bool(false), body)),
        TRUE_CODE => Ok((Element::Bool(true), body)),
        other => Err(StoredError::decode(format!(
            "unknown tuple type code 0x{:02x}",
            other
        ))),
    }
}
