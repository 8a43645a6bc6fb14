//! Dynamic document value type.

/// A dynamic value stored in a NeisanDB document.
///
/// This covers every CBOR value NeisanDB supports. Floats are
/// intentionally excluded: the canonical encoding must be deterministic
/// and comparable byte-for-byte. Map keys are always text, because maps
/// only ever represent documents (field name to value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// String-keyed map (sorted by key for canonical encoding).
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Create a map value with keys sorted in canonical order.
    ///
    /// Canonical CBOR orders text keys by encoded form: shorter keys
    /// first, equal lengths bytewise.
    pub fn map(mut pairs: Vec<(String, Value)>) -> Self {
        pairs.sort_by(|a, b| cmp_text_canonical(&a.0, &b.0));
        Value::Map(pairs)
    }

    /// Returns the contained text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the contained boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the contained bytes, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the contained array, if this is an array value.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map entries, if this is a map value.
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Compare two text keys by their canonical CBOR encoding.
///
/// Text encodes as a length header followed by UTF-8 bytes, so the
/// canonical order is length-first, then bytewise.
pub(crate) fn cmp_text_canonical(a: &str, b: &str) -> std::cmp::Ordering {
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Equal => a.as_bytes().cmp(b.as_bytes()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sorts_keys_canonically() {
        let map = Value::map(vec![
            ("bb".to_string(), Value::Integer(2)),
            ("z".to_string(), Value::Integer(3)),
            ("a".to_string(), Value::Integer(1)),
        ]);

        let pairs = map.as_map().unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        // Shorter keys first, then bytewise
        assert_eq!(keys, vec!["a", "z", "bb"]);
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Text("x".into()).as_text(), Some("x"));
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Bytes(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert!(Value::Null.is_null());
        assert!(Value::Text("x".into()).as_integer().is_none());
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from("hi"), Value::Text("hi".to_string()));
    }
}
