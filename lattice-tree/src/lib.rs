//! Lattice Tree
//!
//! This crate provides lazy deep reactive projections for the Lattice
//! runtime: transparent, path-addressable access to any field of a nested
//! value held in a reactive cell.
//!
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects) the trees are built on
//! - A dynamic value model and the classifier deciding which values may be
//!   decomposed into child nodes
//! - Read-only projections over derived values
//! - Writable projections whose nested writes bubble up to the root cell
//!
//! # Architecture
//!
//! - `reactive`: Cells and dependency tracking
//! - `value`: Dynamic values, conversions and classification
//! - `tree`: Projection nodes, their caches and the write protocol
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_tree::{create_writable, Value};
//! use serde_json::json;
//!
//! let tree = create_writable(json!({"a": {"b": 1}}), None);
//!
//! let b = tree.at(["a", "b"])?.unwrap();
//! b.set(2)?;
//!
//! assert_eq!(tree.read()?, Value::from(json!({"a": {"b": 2}})));
//! assert_eq!(b.read()?, Value::from(2));
//! ```

pub mod error;
pub mod reactive;
pub mod tree;
pub mod value;

pub use error::{Error, Result};
pub use tree::{
    create_read_only, create_writable, Access, Projection, ProjectionOptions, WritableProjection,
};
pub use value::Value;
