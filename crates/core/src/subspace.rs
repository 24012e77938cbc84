//! Subspaces: tuple-prefixed key namespaces

use crate::error::{Result, StoredError};
use crate::range::KeyRange;
use crate::tuple::{Element, Tuple};

/// A key prefix under which packed tuples are stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Subspace {
    prefix: Vec<u8>,
}

impl Subspace {
    /// Subspace over raw prefix bytes
    pub fn from_bytes(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Subspace whose prefix is the packed tuple
    pub fn from_tuple(tuple: &Tuple) -> Self {
        Self {
            prefix: tuple.pack(),
        }
    }

    /// Raw prefix bytes
    pub fn bytes(&self) -> &[u8] {
        &self.prefix
    }

    /// Nested subspace extended by a tuple
    pub fn sub(&self, tuple: &Tuple) -> Subspace {
        let mut prefix = self.prefix.clone();
        tuple.pack_into(&mut prefix);
        Subspace { prefix }
    }

    /// Nested subspace extended by one element
    pub fn sub_element(&self, element: impl Into<Element>) -> Subspace {
        self.sub(&Tuple::from(element.into()))
    }

    /// Key for `tuple` inside this subspace
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut key = self.prefix.clone();
        tuple.pack_into(&mut key);
        key
    }

    /// Decode the tuple that follows this prefix
    ///
    /// # Errors
    ///
    /// Returns `StoredError::Decode` if `key` is outside the subspace or the
    /// suffix is not a valid tuple.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple> {
        if !key.starts_with(&self.prefix) {
            return Err(StoredError::decode("key is not in subspace"));
        }
        Tuple::unpack(&key[self.prefix.len()..])
    }

    /// Whether the key lies under this prefix
    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Range over every packed child: `[prefix ++ 0x00, prefix ++ 0xFF)`
    pub fn range(&self) -> KeyRange {
        let mut begin = self.prefix.clone();
        begin.push(0x00);
        let mut end = self.prefix.clone();
        end.push(0xFF);
        KeyRange::new(begin, end)
    }

    /// Range over the prefix key itself and every child
    pub fn range_inclusive(&self) -> KeyRange {
        KeyRange::with_prefix(&self.prefix)
    }
}
