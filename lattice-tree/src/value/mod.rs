//! Dynamic Values
//!
//! Projection trees operate on values whose shape is not known in advance.
//! [`Value`] is the dynamically typed representation of such a value.
//!
//! # Sharing
//!
//! Containers and heavyweight builtins are reference counted. Cloning a
//! value is cheap, and replacing one field with [`Value::with_field`] keeps
//! every sibling shared with the original. [`Value::same`] observes that
//! sharing; `==` compares structure.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

pub mod classify;
mod convert;

pub use classify::{classify, is_builtin_leaf, is_record_recursable, Builtin, LeafReason, Shape};

/// Named fields of a record or dictionary, in insertion order.
pub type Fields = IndexMap<String, Value>;

/// A dynamically typed, immutable value.
#[derive(Debug, Clone)]
pub enum Value {
    /// No value. Returned by reads along a path that no longer exists.
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),

    /// A closed set of named fields.
    Record(Arc<Fields>),
    /// An open-ended keyed collection.
    Dict(Arc<Fields>),
    Array(Arc<Vec<Value>>),

    Date(Timestamp),
    RegExp(Arc<Pattern>),
    Error(Arc<ErrorValue>),
    Deferred(Deferred),
    Function(Function),
    WeakCollection(WeakCollection),
    Buffer(Arc<[u8]>),
}

/// A point in time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();
        Self { millis }
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }
}

/// A regular expression kept as source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// An error carried as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
}

impl ErrorValue {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

fn next_handle_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Opaque handle to a pending computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Deferred {
    id: u64,
}

impl Deferred {
    pub fn new() -> Self {
        Self {
            id: next_handle_id(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeakKind {
    Map,
    Set,
}

/// Opaque handle to a weakly-keyed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakCollection {
    id: u64,
    kind: WeakKind,
}

impl WeakCollection {
    pub fn new(kind: WeakKind) -> Self {
        Self {
            id: next_handle_id(),
            kind,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> WeakKind {
        self.kind
    }
}

/// A callable value. Compared by identity.
#[derive(Clone)]
pub struct Function(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

/// Parse `key` as a canonical array index: digits only, no leading zeros.
pub(crate) fn canonical_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl Value {
    /// Build a record from named fields.
    pub fn record<K, I>(fields: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a dictionary from keyed entries.
    pub fn dict<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dict(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    /// Human-readable name of the value's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Record(_) => "record",
            Value::Dict(_) => "dictionary",
            Value::Array(_) => "array",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Error(_) => "error",
            Value::Deferred(_) => "deferred",
            Value::Function(_) => "function",
            Value::WeakCollection(_) => "weak collection",
            Value::Buffer(_) => "buffer",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Fields of a record or dictionary.
    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Value::Record(fields) | Value::Dict(fields) => Some(&**fields),
            _ => None,
        }
    }

    /// Look up `key` the way property access would: by name on records and
    /// dictionaries, by canonical index on arrays.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) | Value::Dict(fields) => fields.get(key),
            Value::Array(items) => canonical_index(key).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// A shallow copy with `key` set to `value`.
    ///
    /// Records and dictionaries keep their kind, their key order and every
    /// untouched field by reference. `Undefined` and `Null` become a new
    /// record holding only `key`. Any other kind cannot hold named keys and
    /// yields `None`.
    pub fn with_field(&self, key: &str, value: Value) -> Option<Value> {
        match self {
            Value::Record(fields) => {
                let mut next = Fields::clone(fields);
                next.insert(key.to_owned(), value);
                Some(Value::Record(Arc::new(next)))
            }
            Value::Dict(entries) => {
                let mut next = Fields::clone(entries);
                next.insert(key.to_owned(), value);
                Some(Value::Dict(Arc::new(next)))
            }
            Value::Undefined | Value::Null => Some(Value::record([(key, value)])),
            _ => None,
        }
    }

    /// Truthiness as a dynamic language would judge it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Identity comparison: shared containers and builtins are the same only
    /// if they point at the same allocation; scalars compare by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) | (Value::Dict(a), Value::Dict(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::RegExp(a), Value::RegExp(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            (Value::Buffer(a), Value::Buffer(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Record(a), Value::Record(b)) | (Value::Dict(a), Value::Dict(b)) => {
                Arc::ptr_eq(a, b) || a == b
            }
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::RegExp(a), Value::RegExp(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Deferred(a), Value::Deferred(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::WeakCollection(a), Value::WeakCollection(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_lookup_follows_property_access() {
        let value = Value::from(json!({"a": {"b": 1}, "list": [10, 20]}));

        assert_eq!(value.field("a").and_then(|a| a.field("b")), Some(&Value::from(1)));
        assert_eq!(
            value.field("list").and_then(|l| l.field("1")),
            Some(&Value::from(20))
        );
        assert!(value.field("list").and_then(|l| l.field("01")).is_none());
        assert!(value.field("missing").is_none());
        assert!(Value::from(5).field("a").is_none());
    }

    #[test]
    fn with_field_shares_untouched_siblings() {
        let value = Value::from(json!({"a": {"x": 1}, "b": {"y": 2}, "c": 3}));
        let next = value.with_field("c", Value::from(4)).unwrap();

        assert_eq!(next, Value::from(json!({"a": {"x": 1}, "b": {"y": 2}, "c": 4})));
        assert!(!next.same(&value));
        assert!(next.field("a").unwrap().same(value.field("a").unwrap()));
        assert!(next.field("b").unwrap().same(value.field("b").unwrap()));

        let keys: Vec<_> = next.as_fields().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn with_field_on_empty_slots_creates_a_record() {
        assert_eq!(
            Value::Undefined.with_field("k", Value::from(true)),
            Some(Value::record([("k", Value::from(true))]))
        );
        assert!(Value::Null.with_field("k", Value::Null).is_some());
        assert!(Value::from(1).with_field("k", Value::Null).is_none());
        assert!(Value::array([]).with_field("0", Value::Null).is_none());
    }

    #[test]
    fn dictionaries_stay_dictionaries() {
        let dict = Value::dict([("en", Value::from("hello"))]);
        let next = dict.with_field("fr", Value::from("bonjour")).unwrap();
        assert_eq!(next.kind(), "dictionary");
        assert_eq!(next.field("fr"), Some(&Value::from("bonjour")));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(false).is_truthy());

        assert!(Value::from(-1).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::array([]).is_truthy());
        assert!(Value::record(Vec::<(String, Value)>::new()).is_truthy());
    }

    #[test]
    fn functions_compare_by_identity() {
        let f = Function::new(|_| Value::Null);
        let g = Function::new(|_| Value::Null);

        assert_eq!(Value::Function(f.clone()), Value::Function(f.clone()));
        assert_ne!(Value::Function(f), Value::Function(g));
    }

    #[test]
    fn records_and_dictionaries_are_distinct() {
        let record = Value::record([("a", Value::from(1))]);
        let dict = Value::dict([("a", Value::from(1))]);
        assert_ne!(record, dict);
    }

    #[test]
    fn canonical_indices() {
        assert_eq!(canonical_index("0"), Some(0));
        assert_eq!(canonical_index("42"), Some(42));
        assert_eq!(canonical_index("042"), None);
        assert_eq!(canonical_index("-1"), None);
        assert_eq!(canonical_index(""), None);
        assert_eq!(canonical_index("x1"), None);
    }
}
