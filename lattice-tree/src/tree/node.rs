//! Property access shared by both node kinds.

use std::sync::Arc;

use super::cache::{NodeCache, Resolved};
use super::options::ProjectionOptions;
use super::path::NodePath;
use crate::error::Result;
use crate::reactive::untrack;
use crate::value::Value;

/// Derivation of a node's current value.
pub(crate) type Getter = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

pub(crate) trait TreeNode: Sized + Send + Sync + 'static {
    fn path(&self) -> &NodePath;
    fn options(&self) -> &ProjectionOptions;
    fn cache(&self) -> &NodeCache<Self>;

    /// Re-run the derivation chain down to this node.
    fn derive(&self) -> Result<Value>;

    /// Build the child for `key`.
    fn materialize(self: &Arc<Self>, key: Arc<str>) -> Arc<Self>;
}

/// Resolve `key` on `node`.
///
/// The parent value is read untracked: subscribing is the job of whoever
/// reads the child's value, not of the traversal.
pub(crate) fn access<N: TreeNode>(node: &Arc<N>, key: &str) -> Result<Resolved<N>> {
    let current = untrack(|| node.derive())?;

    node.cache().resolve(node.path(), key, &current, |key| {
        node.options().check_depth(node.path())?;
        Ok(node.materialize(key))
    })
}

/// Read `key` from a parent's value. Paths that no longer exist read as
/// `Undefined`.
pub(crate) fn read_child(parent: &Value, key: &str) -> Value {
    parent.field(key).cloned().unwrap_or(Value::Undefined)
}
