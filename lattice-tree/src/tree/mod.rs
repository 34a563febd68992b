//! Projection Trees
//!
//! A projection tree gives path-addressable, reactive access to the fields of
//! a nested value held by a reactive cell, without declaring the value's
//! shape up front.
//!
//! # Concepts
//!
//! ## Nodes
//!
//! Each node is a derivation: reading it re-reads its parent and picks out
//! one field. Nothing but the node handles is cached, so a read that follows
//! a write through the same path always sees the write.
//!
//! ## Materialization
//!
//! Children are created on first access to a key, and only when the
//! parent's current value is a record that contains the key (see
//! [`crate::value::classify`]). Arrays, dictionaries and builtins are
//! projected whole. A child is dropped from its parent's cache the first
//! time it is accessed after its key disappeared; if the key comes back, a
//! fresh node is created.
//!
//! ## Writing
//!
//! [`WritableProjection`] nodes add `set` and `update`. A write below the
//! root rebuilds every ancestor as a shallow copy and ends in a single write
//! of the root cell.
//!
//! # Implementation Notes
//!
//! A parent's cache owns its children until their key is found absent.
//! Children reach upward only through the parent's getter and write
//! closures, never through the parent node, so the tree has no reference
//! cycles. A child handle keeps working after the root handle is dropped.

mod cache;
mod node;
mod options;
mod path;
mod readonly;
mod writable;

pub use cache::SlotState;
pub use options::ProjectionOptions;
pub use path::NodePath;
pub use readonly::Projection;
pub use writable::{RootWriteHook, Source, WritableProjection};

use std::sync::Arc;

use crate::error::Result;
use crate::value::Value;
use cache::Resolved;

/// Result of accessing a key on a node.
#[derive(Debug, Clone)]
pub enum Access<N> {
    /// A child node for the key.
    Node(N),
    /// A plain value the caller attached at the key.
    Attached(Value),
    /// Nothing lives at the key.
    Absent,
}

impl<N> Access<N> {
    fn from_resolved<M>(resolved: Resolved<M>, wrap: impl FnOnce(Arc<M>) -> N) -> Self {
        match resolved {
            Resolved::Node(node) => Access::Node(wrap(node)),
            Resolved::Attached(value) => Access::Attached(value),
            Resolved::Absent => Access::Absent,
        }
    }

    pub fn into_node(self) -> Option<N> {
        match self {
            Access::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Access::Absent)
    }

    /// Nodes are always truthy; attached values by their own truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Access::Node(_) => true,
            Access::Attached(value) => value.is_truthy(),
            Access::Absent => false,
        }
    }
}

/// Create a read-only projection over the value returned by `derive`.
pub fn create_read_only<F>(derive: F) -> Projection
where
    F: Fn() -> Result<Value> + Send + Sync + 'static,
{
    Projection::new(derive)
}

/// Create a writable projection over an initial value or an existing cell.
///
/// `on_root_write` runs after every write of the root cell.
pub fn create_writable(
    source: impl Into<Source>,
    on_root_write: Option<RootWriteHook>,
) -> WritableProjection {
    WritableProjection::with_options(source, on_root_write, ProjectionOptions::default())
}
