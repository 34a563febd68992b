//! Writable projections.
//!
//! A writable tree adds `set` and `update` to every node. Each node carries
//! an upward callback wired when the node is created:
//!
//! - the root's callback writes the reactive cell and fires the root write
//!   hook;
//! - a child's callback reads its parent's current value untracked, copies
//!   it with the child's key replaced, and hands the copy to the parent's
//!   own callback.
//!
//! Setting a value three levels deep therefore performs three shallow merges
//! (leaf, mid, root) followed by a single cell write. Untouched siblings are
//! shared with the previous snapshot at every level.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::cache::{NodeCache, SlotState};
use super::node::{self, Getter, TreeNode};
use super::options::ProjectionOptions;
use super::path::NodePath;
use super::Access;
use crate::error::{Error, Result};
use crate::reactive::{untrack, Readable, Signal, Writable};
use crate::value::Value;

/// Upward update callback.
type Bubble = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// Hook invoked with every value written to the root cell.
pub type RootWriteHook = Arc<dyn Fn(&Value) + Send + Sync>;

/// Where a writable tree keeps its root value.
#[derive(Clone)]
pub enum Source {
    /// An initial value; the tree creates its own signal for it.
    Value(Value),
    /// An existing cell shared with other code.
    Cell(Arc<dyn Writable<Value>>),
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Value(value)
    }
}

impl From<serde_json::Value> for Source {
    fn from(json: serde_json::Value) -> Self {
        Source::Value(Value::from(json))
    }
}

impl From<Signal<Value>> for Source {
    fn from(signal: Signal<Value>) -> Self {
        Source::Cell(Arc::new(signal))
    }
}

impl From<Arc<dyn Writable<Value>>> for Source {
    fn from(cell: Arc<dyn Writable<Value>>) -> Self {
        Source::Cell(cell)
    }
}

struct WritableNode {
    path: NodePath,
    getter: Getter,
    bubble: Bubble,
    cache: NodeCache<WritableNode>,
    options: Arc<ProjectionOptions>,
}

impl TreeNode for WritableNode {
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
        let path = self.path.child(Arc::clone(&key));

        let parent = Arc::clone(&self.getter);
        let read_key = Arc::clone(&key);
        let getter: Getter = Arc::new(move || Ok(node::read_child(&parent()?, &read_key)));

        let parent_getter = Arc::clone(&self.getter);
        let parent_bubble = Arc::clone(&self.bubble);
        let parent_path = self.path.clone();
        let options = Arc::clone(&self.options);
        let bubble: Bubble = Arc::new(move |value: Value| {
            let snapshot = untrack(|| parent_getter())?;
            let merged = snapshot
                .with_field(&key, value)
                .ok_or_else(|| Error::NotMergeable {
                    path: parent_path.to_string(),
                    key: key.to_string(),
                    found: snapshot.kind(),
                })?;
            trace!(
                label = options.label.as_deref(),
                path = %parent_path,
                key = %key,
                "merged child update"
            );
            parent_bubble(merged)
        });

        Arc::new(WritableNode {
            path,
            getter,
            bubble,
            cache: NodeCache::new(),
            options: Arc::clone(&self.options),
        })
    }
}

/// A projection whose nodes can be written.
///
/// # Example
///
/// ```rust,ignore
/// let tree = WritableProjection::new(json!({"a": {"b": 1}}));
/// tree.at(["a", "b"])?.unwrap().set(2)?;
///
/// assert_eq!(tree.read()?, Value::from(json!({"a": {"b": 2}})));
/// ```
#[derive(Clone)]
pub struct WritableProjection {
    node: Arc<WritableNode>,
}

impl WritableProjection {
    pub fn new(source: impl Into<Source>) -> Self {
        Self::with_options(source, None, ProjectionOptions::default())
    }

    pub fn with_options(
        source: impl Into<Source>,
        on_root_write: Option<RootWriteHook>,
        options: ProjectionOptions,
    ) -> Self {
        let cell: Arc<dyn Writable<Value>> = match source.into() {
            Source::Value(value) => Arc::new(Signal::new(value)),
            Source::Cell(cell) => cell,
        };

        let reader = Arc::clone(&cell);
        let getter: Getter = Arc::new(move || Ok(reader.read()));

        let label = options.label.clone();
        let bubble: Bubble = Arc::new(move |value: Value| {
            debug!(label = label.as_deref(), kind = value.kind(), "writing projection root");
            match &on_root_write {
                Some(hook) => {
                    cell.write(value.clone());
                    hook(&value);
                }
                None => cell.write(value),
            }
            Ok(())
        });

        Self {
            node: Arc::new(WritableNode {
                path: NodePath::root(),
                getter,
                bubble,
                cache: NodeCache::new(),
                options: Arc::new(options),
            }),
        }
    }

    /// The current value, subscribing the running computation to the root
    /// cell.
    pub fn read(&self) -> Result<Value> {
        self.node.derive()
    }

    pub fn read_untracked(&self) -> Result<Value> {
        untrack(|| self.node.derive())
    }

    /// Replace this node's value.
    ///
    /// At the root this writes the cell. Below the root the write bubbles
    /// up, rebuilding each ancestor with the new value in place. A missing
    /// or null ancestor is replaced by a new record; an ancestor that is now
    /// a scalar, array or builtin fails with [`Error::NotMergeable`] and the
    /// cell is left untouched.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        (self.node.bubble)(value.into())
    }

    /// Replace this node's value with `f(current)`. `f` runs exactly once.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Value) -> Value,
    {
        let current = self.read_untracked()?;
        self.set(f(current))
    }

    /// Access the child at `key`.
    pub fn get(&self, key: &str) -> Result<Access<WritableProjection>> {
        let resolved = node::access(&self.node, key)?;
        Ok(Access::from_resolved(resolved, |node| WritableProjection { node }))
    }

    /// The child node at `key`, if `key` currently projects.
    pub fn child(&self, key: &str) -> Result<Option<WritableProjection>> {
        Ok(self.get(key)?.into_node())
    }

    /// Walk several keys at once. Stops at the first key that is not a node.
    pub fn at<'a, I>(&self, keys: I) -> Result<Option<WritableProjection>>
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

    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_truthy())
    }

    pub fn attach(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.node.cache.attach(key, value.into())
    }

    pub fn detach(&self, key: &str) -> Option<Value> {
        self.node.cache.detach(key)
    }

    pub fn slot_state(&self, key: &str) -> SlotState {
        self.node.cache.state(key)
    }

    pub fn materialized(&self) -> usize {
        self.node.cache.materialized()
    }

    pub fn path(&self) -> &NodePath {
        &self.node.path
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.node.options
    }

    pub fn ptr_eq(&self, other: &WritableProjection) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for WritableProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableProjection")
            .field("path", &format_args!("{}", self.node.path))
            .field("label", &self.node.options.label)
            .field("materialized", &self.materialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::SubscriberId;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn root_set_writes_the_cell() {
        let cell = Signal::new(Value::from(json!({"a": 1})));
        let tree = WritableProjection::new(cell.clone());

        tree.set(Value::from(json!({"b": 2}))).unwrap();
        assert_eq!(cell.get(), Value::from(json!({"b": 2})));
    }

    #[test]
    fn nested_set_rebuilds_every_ancestor() {
        let tree = WritableProjection::new(json!({
            "left": {"x": 1},
            "right": {"inner": {"y": 2}, "keep": {"z": 3}},
        }));
        let before = tree.read().unwrap();

        tree.at(["right", "inner", "y"]).unwrap().unwrap().set(20).unwrap();
        let after = tree.read().unwrap();

        assert_eq!(
            after,
            Value::from(json!({
                "left": {"x": 1},
                "right": {"inner": {"y": 20}, "keep": {"z": 3}},
            }))
        );

        assert!(!after.same(&before));
        let right_before = before.field("right").unwrap();
        let right_after = after.field("right").unwrap();
        assert!(!right_after.same(right_before));
        assert!(after.field("left").unwrap().same(before.field("left").unwrap()));
        assert!(right_after
            .field("keep")
            .unwrap()
            .same(right_before.field("keep").unwrap()));
    }

    #[test]
    fn deep_set_merges_each_ancestor_and_writes_once() {
        let cell = Signal::new(Value::from(json!({
            "a": {"b": {"c": 1, "keep": [1]}, "side": {"x": 1}},
            "top": {"y": 2},
        })));
        let writes = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&writes);
        cell.subscribe(SubscriberId::new(), move || *counter.lock() += 1);

        let tree = WritableProjection::new(cell.clone());
        let c = tree.at(["a", "b", "c"]).unwrap().unwrap();
        let before = tree.read().unwrap();

        c.set(2).unwrap();
        assert_eq!(*writes.lock(), 1);

        let after = tree.read().unwrap();
        let (a_before, a_after) = (before.field("a").unwrap(), after.field("a").unwrap());
        let (b_before, b_after) = (a_before.field("b").unwrap(), a_after.field("b").unwrap());

        assert!(!after.same(&before));
        assert!(!a_after.same(a_before));
        assert!(!b_after.same(b_before));
        assert_eq!(b_after.field("c"), Some(&Value::from(2)));

        assert!(after.field("top").unwrap().same(before.field("top").unwrap()));
        assert!(a_after.field("side").unwrap().same(a_before.field("side").unwrap()));
        assert!(b_after.field("keep").unwrap().same(b_before.field("keep").unwrap()));

        c.update(|n| Value::from(n.as_f64().unwrap_or_default() * 10.0)).unwrap();
        assert_eq!(*writes.lock(), 2);
        assert_eq!(c.read().unwrap(), Value::from(20));
    }

    #[test]
    fn attachments_on_children_survive_dropped_handles() {
        let tree = WritableProjection::new(json!({"a": {"b": 1}}));
        tree.child("a").unwrap().unwrap().attach("meta", "pinned");

        tree.at(["a", "b"]).unwrap().unwrap().set(2).unwrap();

        let a = tree.child("a").unwrap().unwrap();
        assert_eq!(a.detach("meta"), Some(Value::from("pinned")));
        assert_eq!(tree.slot_state("a"), SlotState::Materialized);
    }

    #[test]
    fn child_writes_outlive_the_root_handle() {
        let cell = Signal::new(Value::from(json!({"a": {"b": 1}})));
        let tree = WritableProjection::new(cell.clone());
        let b = tree.at(["a", "b"]).unwrap().unwrap();
        drop(tree);

        b.set(3).unwrap();
        assert_eq!(cell.get(), Value::from(json!({"a": {"b": 3}})));
    }

    #[test]
    fn root_hook_sees_every_write() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: RootWriteHook = Arc::new(move |value: &Value| sink.lock().push(value.clone()));

        let tree = WritableProjection::with_options(
            json!({"a": {"b": 1}}),
            Some(hook),
            ProjectionOptions::default(),
        );
        tree.at(["a", "b"]).unwrap().unwrap().set(2).unwrap();
        tree.set(Value::from(json!({}))).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Value::from(json!({"a": {"b": 2}})));
        assert_eq!(seen[1], Value::from(json!({})));
    }

    #[test]
    fn update_runs_its_function_once() {
        let tree = WritableProjection::new(json!({"count": 1}));
        let count = tree.child("count").unwrap().unwrap();
        let calls = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&calls);
        count
            .update(|current| {
                *counter.lock() += 1;
                Value::from(current.as_f64().unwrap_or_default() + 1.0)
            })
            .unwrap();

        assert_eq!(*calls.lock(), 1);
        assert_eq!(count.read().unwrap(), Value::from(2));
    }

    #[test]
    fn stale_nodes_recreate_their_path() {
        let tree = WritableProjection::new(json!({"a": {"b": 1}}));
        let b = tree.at(["a", "b"]).unwrap().unwrap();

        tree.set(Value::from(json!({"other": true}))).unwrap();
        b.set(5).unwrap();

        assert_eq!(
            tree.read().unwrap(),
            Value::from(json!({"other": true, "a": {"b": 5}}))
        );
    }

    #[test]
    fn bubbling_into_a_scalar_fails() {
        let tree = WritableProjection::new(json!({"a": {"b": 1}}));
        let b = tree.at(["a", "b"]).unwrap().unwrap();

        tree.set(Value::from(json!({"a": 7}))).unwrap();
        let err = b.set(2).unwrap_err();

        assert!(matches!(
            err,
            Error::NotMergeable { ref path, ref key, found: "number" } if path == "a" && key == "b"
        ));
        assert_eq!(tree.read().unwrap(), Value::from(json!({"a": 7})));
    }

    #[test]
    fn writes_through_dictionary_values_keep_their_kind() {
        let tree = WritableProjection::new(Value::record([(
            "labels",
            Value::dict([("en", Value::from("hi"))]),
        )]));
        let labels = tree.child("labels").unwrap().unwrap();

        assert!(labels.get("en").unwrap().into_node().is_none());
        labels
            .update(|current| current.with_field("fr", Value::from("salut")).unwrap_or(current))
            .unwrap();

        let labels_value = labels.read().unwrap();
        assert_eq!(labels_value.kind(), "dictionary");
        assert_eq!(labels_value.field("fr"), Some(&Value::from("salut")));
    }
}
