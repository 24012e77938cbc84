//! Key ranges, selectors and range-read options

/// Marker key that sorts after every user key
pub const END_KEY: &[u8] = &[0xFF];

/// A key/value pair returned from a range read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Full key, including any subspace prefix
    pub key: Vec<u8>,
    /// Stored bytes
    pub value: Vec<u8>,
}

impl KeyValue {
    /// Create a key/value pair
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

/// Half-open key range `[begin, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    /// Inclusive start
    pub begin: Vec<u8>,
    /// Exclusive end
    pub end: Vec<u8>,
}

impl KeyRange {
    /// Create a range from explicit bounds
    pub fn new(begin: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Range holding exactly one key
    pub fn single(key: &[u8]) -> Self {
        let mut end = key.to_vec();
        end.push(0x00);
        Self {
            begin: key.to_vec(),
            end,
        }
    }

    /// Range holding `prefix` itself and every key below it in tuple order
    ///
    /// Tuple type codes never reach `0xFF`, so `prefix ++ 0xFF` bounds every
    /// packed child of the prefix.
    pub fn with_prefix(prefix: &[u8]) -> Self {
        let mut end = prefix.to_vec();
        end.push(0xFF);
        Self {
            begin: prefix.to_vec(),
            end,
        }
    }

    /// Whether the range contains no keys
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Whether `key` lies in the range
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.begin.as_slice() && key < self.end.as_slice()
    }

    /// Whether two ranges share at least one key
    pub fn intersects(&self, other: &KeyRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.begin < other.end
            && other.begin < self.end
    }
}

/// How a range read should deliver rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingMode {
    /// Fetch the whole range eagerly
    #[default]
    WantAll,
    /// Deliver rows as the caller iterates
    Iterator,
}

/// Options for a range read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeOptions {
    /// Maximum rows to return (`None` = unbounded)
    pub limit: Option<usize>,
    /// Scan from the end of the range backwards
    pub reverse: bool,
    /// Delivery mode
    pub mode: StreamingMode,
}

impl RangeOptions {
    /// Stream every row of the range in ascending order
    pub fn want_all() -> Self {
        Self::default()
    }

    /// Set the row limit
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Set scan direction
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Selects the first key after (or at) a reference key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySelector {
    /// Reference key
    pub key: Vec<u8>,
    /// Whether the reference key itself may be selected
    pub or_equal: bool,
}

impl KeySelector {
    /// First key strictly greater than `key`
    pub fn first_greater_than(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            or_equal: false,
        }
    }

    /// First key greater than or equal to `key`
    pub fn first_greater_or_equal(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            or_equal: true,
        }
    }

    /// The range a store searches to resolve this selector
    pub fn search_range(&self) -> KeyRange {
        let mut begin = self.key.clone();
        if !self.or_equal {
            begin.push(0x00);
        }
        KeyRange::new(begin, END_KEY.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_range_contains_only_key() {
        let r = KeyRange::single(b"abc");
        assert!(r.contains(b"abc"));
        assert!(!r.contains(b"abd"));
        assert!(!r.contains(b"abc\x00"));
    }

    #[test]
    fn test_prefix_range_includes_prefix_and_children() {
        let r = KeyRange::with_prefix(b"\x02a\x00");
        assert!(r.contains(b"\x02a\x00"));
        assert!(r.contains(b"\x02a\x00\x15\x01"));
        assert!(!r.contains(b"\x02b\x00"));
    }

    #[test]
    fn test_intersects() {
        let a = KeyRange::new(b"a".to_vec(), b"c".to_vec());
        let b = KeyRange::new(b"b".to_vec(), b"d".to_vec());
        let c = KeyRange::new(b"c".to_vec(), b"e".to_vec());
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&KeyRange::new(b"b".to_vec(), b"b".to_vec())));
    }

    #[test]
    fn test_selector_search_range() {
        let gt = KeySelector::first_greater_than(b"k".to_vec()).search_range();
        assert_eq!(gt.begin, b"k\x00".to_vec());
        let ge = KeySelector::first_greater_or_equal(b"k".to_vec()).search_range();
        assert_eq!(ge.begin, b"k".to_vec());
        assert_eq!(ge.end, END_KEY.to_vec());
    }
}
