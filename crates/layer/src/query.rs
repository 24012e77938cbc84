//! Index range queries

use stored_core::{Element, Tuple};

/// A prefix scan over a non-unique index
///
/// `values` selects the index-key prefix to scan. `from` is a cursor inside
/// that prefix: the inclusive lower bound when scanning forward, the
/// exclusive upper bound when scanning in reverse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) values: Tuple,
    pub(crate) from: Option<Tuple>,
    pub(crate) limit: Option<usize>,
    pub(crate) reverse: bool,
}

impl Query {
    /// Scan the whole index
    pub fn all() -> Self {
        Self::default()
    }

    /// Scan entries whose index key starts with `value`
    pub fn equal(value: impl Into<Element>) -> Self {
        Self {
            values: Tuple::from(value.into()),
            ..Self::default()
        }
    }

    /// Scan entries under an index-key prefix tuple
    pub fn prefix(values: Tuple) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Continue from a cursor
    pub fn cursor(mut self, cursor: Tuple) -> Self {
        self.from = Some(cursor);
        self
    }

    /// Cap the number of entries; `0` means no cap
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Scan in descending key order
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}
