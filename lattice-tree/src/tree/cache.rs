//! Per-node child cache.
//!
//! Every node owns one cache mapping property keys to slots. A slot holds
//! either a child node created by the tree or a plain value attached by the
//! caller. Only tree-created slots are subject to eviction.
//!
//! Slot lifecycle for a key:
//!
//! ```text
//! Unmaterialized --(key present)--> Materialized
//! Materialized   --(key absent)---> evicted, back to Unmaterialized
//! ```
//!
//! A materialized child stays cached until its key is found absent, whether
//! or not the caller still holds a handle to it. Children never point back
//! at their parent node, only at the parent's derivation closures, so the
//! cache can own them outright.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::path::NodePath;
use crate::error::Result;
use crate::value::{self, Value};

enum Slot<N> {
    Node(Arc<N>),
    Attached(Value),
}

/// Observable state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unmaterialized,
    Materialized,
    Attached,
}

pub(crate) enum Resolved<N> {
    Node(Arc<N>),
    Attached(Value),
    Absent,
}

pub(crate) struct NodeCache<N> {
    slots: Mutex<IndexMap<Arc<str>, Slot<N>>>,
}

/// True if `key` names a child of `current` that may become a node.
pub(crate) fn projects(current: &Value, key: &str) -> bool {
    value::is_record_recursable(current) && current.field(key).is_some()
}

impl<N> NodeCache<N> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(IndexMap::new()),
        }
    }

    /// Resolve `key` against the owner's current value.
    ///
    /// `materialize` runs at most once, with the cache locked; it must only
    /// construct the child. If it fails, nothing is cached.
    pub(crate) fn resolve<F>(
        &self,
        owner: &NodePath,
        key: &str,
        current: &Value,
        materialize: F,
    ) -> Result<Resolved<N>>
    where
        F: FnOnce(Arc<str>) -> Result<Arc<N>>,
    {
        let mut slots = self.slots.lock();

        if !projects(current, key) {
            if matches!(slots.get(key), Some(Slot::Node(_))) {
                slots.shift_remove(key);
                trace!(path = %owner, key, "evicted projection node");
            }
            return Ok(match slots.get(key) {
                Some(Slot::Attached(value)) => Resolved::Attached(value.clone()),
                _ => Resolved::Absent,
            });
        }

        match slots.get(key) {
            Some(Slot::Attached(value)) => return Ok(Resolved::Attached(value.clone())),
            Some(Slot::Node(node)) => return Ok(Resolved::Node(Arc::clone(node))),
            None => {}
        }

        let key: Arc<str> = Arc::from(key);
        let node = materialize(Arc::clone(&key))?;
        trace!(path = %owner, key = %key, "materialized projection node");
        slots.insert(key, Slot::Node(Arc::clone(&node)));
        Ok(Resolved::Node(node))
    }

    /// Place a caller value at `key`, replacing whatever slot was there.
    pub(crate) fn attach(&self, key: &str, value: Value) -> Option<Value> {
        match self.slots.lock().insert(Arc::from(key), Slot::Attached(value)) {
            Some(Slot::Attached(previous)) => Some(previous),
            _ => None,
        }
    }

    /// Remove a caller value. Tree-created nodes are left alone.
    pub(crate) fn detach(&self, key: &str) -> Option<Value> {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Attached(_)) => match slots.shift_remove(key) {
                Some(Slot::Attached(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn state(&self, key: &str) -> SlotState {
        match self.slots.lock().get(key) {
            Some(Slot::Attached(_)) => SlotState::Attached,
            Some(Slot::Node(_)) => SlotState::Materialized,
            None => SlotState::Unmaterialized,
        }
    }

    /// Number of cached child nodes.
    pub(crate) fn materialized(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Node(_)))
            .count()
    }
}
