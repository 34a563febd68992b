//! Record Classification
//!
//! Decides whether a value may be decomposed into child projection nodes.
//!
//! Only records with a closed, named set of fields are recursable. Arrays,
//! dictionaries and records keyed purely by array indices have an
//! open-ended key space: projecting them per key would churn nodes without
//! stable identity, so they stay whole. Builtins are opaque.

use super::{canonical_index, Value};

/// The builtin kinds that are never decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Date,
    RegExp,
    Error,
    Deferred,
    Function,
    WeakCollection,
    Buffer,
}

/// Why a value is treated as an atomic leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafReason {
    /// Undefined, null, booleans, numbers and strings.
    Primitive,
    Builtin(Builtin),
    Array,
    Dictionary,
    /// A record without fields.
    Empty,
    /// A record whose every key is an array index.
    IndexKeyed,
}

/// Result of classifying a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Record,
    Leaf(LeafReason),
}

pub fn classify(value: &Value) -> Shape {
    let reason = match value {
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            LeafReason::Primitive
        }
        Value::Date(_) => LeafReason::Builtin(Builtin::Date),
        Value::RegExp(_) => LeafReason::Builtin(Builtin::RegExp),
        Value::Error(_) => LeafReason::Builtin(Builtin::Error),
        Value::Deferred(_) => LeafReason::Builtin(Builtin::Deferred),
        Value::Function(_) => LeafReason::Builtin(Builtin::Function),
        Value::WeakCollection(_) => LeafReason::Builtin(Builtin::WeakCollection),
        Value::Buffer(_) => LeafReason::Builtin(Builtin::Buffer),
        Value::Array(_) => LeafReason::Array,
        Value::Dict(_) => LeafReason::Dictionary,
        Value::Record(fields) if fields.is_empty() => LeafReason::Empty,
        Value::Record(fields) if fields.keys().all(|k| canonical_index(k).is_some()) => {
            LeafReason::IndexKeyed
        }
        Value::Record(_) => return Shape::Record,
    };
    Shape::Leaf(reason)
}

/// True if `value` may be decomposed into child nodes.
pub fn is_record_recursable(value: &Value) -> bool {
    classify(value) == Shape::Record
}

pub fn is_builtin_leaf(value: &Value) -> bool {
    !is_record_recursable(value)
}
