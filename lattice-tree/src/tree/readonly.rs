//! Read-only projections.

use std::fmt;
use std::sync::Arc;

use super::cache::{NodeCache, SlotState};
use super::node::{self, Getter, TreeNode};
use super::options::ProjectionOptions;
use super::path::NodePath;
use super::Access;
use crate::error::Result;
use crate::reactive::{untrack, Readable};
use crate::value::Value;

struct ProjectionNode {
    path: NodePath,
    getter: Getter,
    cache: NodeCache<ProjectionNode>,
    options: Arc<ProjectionOptions>,
}

impl TreeNode for ProjectionNode {
    fn path(&self) -> &NodePath {
        &self.path
    }

    fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    fn cache(&self) -> &NodeCache<Self> {
        &self.cache
    }

    fn derive(&self) -> Result<Value> {
        (self.getter)()
    }

    fn materialize(self: &Arc<Self>, key: Arc<str>) -> Arc<Self> {
        let parent = Arc::clone(&self.getter);
        let path = self.path.child(Arc::clone(&key));
        let getter: Getter = Arc::new(move || Ok(node::read_child(&parent()?, &key)));

        Arc::new(ProjectionNode {
            path,
            getter,
            cache: NodeCache::new(),
            options: Arc::clone(&self.options),
        })
    }
}

/// A lazily materialized, path-addressable view of a derived value.
///
/// Reading a node re-runs the derivation and walks down to its path, so a
/// node never holds a stale value. Only the node handles are cached.
///
/// # Example
///
/// ```rust,ignore
/// let cell = Signal::new(Value::from(json!({"a": 1, "b": {"c": 2}})));
/// let tree = Projection::from_cell(cell);
///
/// assert_eq!(tree.at(["b", "c"])?.unwrap().read()?, Value::from(2));
/// ```
#[derive(Clone)]
pub struct Projection {
    node: Arc<ProjectionNode>,
}

impl Projection {
    /// Project the value returned by `derive`.
    pub fn new<F>(derive: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_options(derive, ProjectionOptions::default())
    }

    pub fn with_options<F>(derive: F, options: ProjectionOptions) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            node: Arc::new(ProjectionNode {
                path: NodePath::root(),
                getter: Arc::new(derive),
                cache: NodeCache::new(),
                options: Arc::new(options),
            }),
        }
    }

    /// Project the value held by a reactive cell.
    pub fn from_cell<C>(cell: C) -> Self
    where
        C: Readable<Value> + 'static,
    {
        Self::new(move || Ok(cell.read()))
    }

    /// The current value, subscribing the running computation to every cell
    /// the derivation reads.
    pub fn read(&self) -> Result<Value> {
        self.node.derive()
    }

    pub fn read_untracked(&self) -> Result<Value> {
        untrack(|| self.node.derive())
    }

    /// Access the child at `key`.
    pub fn get(&self, key: &str) -> Result<Access<Projection>> {
        let resolved = node::access(&self.node, key)?;
        Ok(Access::from_resolved(resolved, |node| Projection { node }))
    }

    /// The child node at `key`, if `key` currently projects.
    pub fn child(&self, key: &str) -> Result<Option<Projection>> {
        Ok(self.get(key)?.into_node())
    }

    /// Walk several keys at once. Stops at the first key that is not a node.
    pub fn at<'a, I>(&self, keys: I) -> Result<Option<Projection>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self.clone();
        for key in keys {
            match current.child(key)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Membership test agreeing with [`get`](Self::get): true unless the
    /// access yields nothing or a falsy attached value.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_truthy())
    }

    /// Place a plain value at `key` on this node. Returns the value it
    /// replaced, if any.
    pub fn attach(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.node.cache.attach(key, value.into())
    }

    pub fn detach(&self, key: &str) -> Option<Value> {
        self.node.cache.detach(key)
    }

    pub fn slot_state(&self, key: &str) -> SlotState {
        self.node.cache.state(key)
    }

    /// Number of live child nodes.
    pub fn materialized(&self) -> usize {
        self.node.cache.materialized()
    }

    pub fn path(&self) -> &NodePath {
        &self.node.path
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.node.options
    }

    /// True if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Projection) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("path", &format_args!("{}", self.node.path))
            .field("label", &self.node.options.label)
            .field("materialized", &self.materialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reactive::Signal;
    use serde_json::json;

    fn tree_over(value: serde_json::Value) -> (Signal<Value>, Projection) {
        let cell = Signal::new(Value::from(value));
        let tree = Projection::from_cell(cell.clone());
        (cell, tree)
    }

    #[test]
    fn reads_nested_fields() {
        let (_cell, tree) = tree_over(json!({"a": 1, "b": {"c": 2}}));

        assert_eq!(tree.child("a").unwrap().unwrap().read().unwrap(), Value::from(1));
        assert_eq!(tree.at(["b", "c"]).unwrap().unwrap().read().unwrap(), Value::from(2));
        assert_eq!(tree.at(["b", "c"]).unwrap().unwrap().path().to_string(), "b.c");
    }

    #[test]
    fn nodes_are_stable_while_present() {
        let (cell, tree) = tree_over(json!({"a": {"b": 1}}));
        let first = tree.child("a").unwrap().unwrap();

        cell.set(Value::from(json!({"a": {"b": 2}})));
        let second = tree.child("a").unwrap().unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(second.child("b").unwrap().unwrap().read().unwrap(), Value::from(2));
    }

    #[test]
    fn reads_never_return_cached_values() {
        let (cell, tree) = tree_over(json!({"a": {"b": 1}}));
        let b = tree.at(["a", "b"]).unwrap().unwrap();

        cell.set(Value::from(json!({"a": {"b": 5}})));
        assert_eq!(b.read().unwrap(), Value::from(5));

        cell.set(Value::from(json!({"z": 0})));
        assert_eq!(b.read().unwrap(), Value::Undefined);
    }

    #[test]
    fn children_outlive_dropped_handles() {
        let (_cell, tree) = tree_over(json!({"a": {"b": 1}}));
        tree.child("a").unwrap().unwrap().attach("meta", "pinned");

        assert_eq!(tree.slot_state("a"), SlotState::Materialized);
        assert_eq!(tree.materialized(), 1);

        let a = tree.child("a").unwrap().unwrap();
        assert!(matches!(a.get("meta").unwrap(), Access::Attached(Value::String(_))));
        assert_eq!(a.slot_state("meta"), SlotState::Attached);
    }

    #[test]
    fn child_handles_outlive_the_root() {
        let (cell, tree) = tree_over(json!({"a": {"b": 1}}));
        let b = tree.at(["a", "b"]).unwrap().unwrap();
        drop(tree);

        cell.set(Value::from(json!({"a": {"b": 9}})));
        assert_eq!(b.read().unwrap(), Value::from(9));
    }

    #[test]
    fn derivation_errors_surface_at_every_level() {
        let cell = Signal::new(Value::from(json!({"a": {"b": 1}})));
        let source = cell.clone();
        let tree = Projection::new(move || {
            let value = source.get();
            if value.field("fail").is_some() {
                return Err(Error::derive("derivation failed"));
            }
            Ok(value)
        });
        let b = tree.at(["a", "b"]).unwrap().unwrap();

        cell.set(Value::from(json!({"fail": true})));

        assert_eq!(b.read().unwrap_err().to_string(), "derivation failed");
        assert!(tree.get("a").is_err());
        assert!(tree.has("a").is_err());
    }

    #[test]
    fn depth_limit_blocks_deep_children() {
        let cell = Signal::new(Value::from(json!({"a": {"b": {"c": 1}}})));
        let source = cell.clone();
        let tree = Projection::with_options(
            move || Ok(source.get()),
            ProjectionOptions::new().max_depth(2),
        );

        let b = tree.at(["a", "b"]).unwrap().unwrap();
        assert!(matches!(
            b.get("c"),
            Err(Error::DepthExceeded { limit: 2, .. })
        ));
        assert_eq!(b.read().unwrap(), Value::from(json!({"c": 1})));
    }

    #[test]
    fn debug_shows_path_and_label() {
        let tree = Projection::with_options(
            || Ok(Value::from(json!({"a": 1}))),
            ProjectionOptions::new().label("prefs"),
        );
        let rendered = format!("{:?}", tree.child("a").unwrap().unwrap());
        assert!(rendered.contains("path: a"));
        assert!(rendered.contains("prefs"));
    }
}
