//! Node paths.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// The chain of keys leading from the root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(SmallVec<[Arc<str>; 4]>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub(crate) fn child(&self, key: Arc<str>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key);
        Self(segments)
    }

    /// Number of keys between the root and this node.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|segment| &**segment)
    }

    /// The last key, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(|segment| &**segment)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_dotted_keys() {
        let root = NodePath::root();
        let leaf = root.child(Arc::from("a")).child(Arc::from("b"));

        assert_eq!(root.to_string(), "$");
        assert_eq!(leaf.to_string(), "a.b");
        assert_eq!(leaf.depth(), 2);
        assert_eq!(leaf.key(), Some("b"));
        assert_eq!(leaf.segments().collect::<Vec<_>>(), ["a", "b"]);
        assert!(root.is_root());
    }
}
