//! Attribute sets: the label dimension that splits one instrument into series.
//!
//! Pairs are kept sorted by key with duplicate keys collapsed (last write
//! wins), so equality, hashing and ordering never depend on insertion order.
//! Floats compare by total order and hash by bit pattern, which keeps the set
//! usable as a map key even when it carries a NaN.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Attribute value.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Bool(bool),
    I64(i64),
    F64(f64),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::String(_) => 0,
            Value::Bool(_) => 1,
            Value::I64(_) => 2,
            Value::F64(_) => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::F64(a), Value::F64(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::I64(i) => i.hash(state),
            Value::F64(f) => f.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I64(i) => write!(f, "{i}"),
            Value::F64(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

/// One attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    pub fn i64(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::I64(value))
    }

    pub fn f64(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::F64(value))
    }
}

/// Order-independent set of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeSet {
    pairs: Vec<KeyValue>,
}

impl AttributeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(pairs: impl IntoIterator<Item = KeyValue>) -> Self {
        let mut pairs: Vec<KeyValue> = pairs.into_iter().collect();
        // stable sort keeps insertion order among equal keys, so the last one wins below
        pairs.sort_by(|a, b| a.key.cmp(&b.key));

        let mut deduped: Vec<KeyValue> = Vec::with_capacity(pairs.len());
        for kv in pairs {
            match deduped.last_mut() {
                Some(last) if last.key == kv.key => *last = kv,
                _ => deduped.push(kv),
            }
        }
        Self { pairs: deduped }
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.pairs.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.pairs
            .binary_search_by(|kv| kv.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.pairs[i].value)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<KeyValue> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = KeyValue>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<const N: usize> From<[KeyValue; N]> for AttributeSet {
    fn from(pairs: [KeyValue; N]) -> Self {
        Self::new(pairs)
    }
}
