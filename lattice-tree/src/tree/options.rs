//! Projection configuration.

use serde::{Deserialize, Serialize};

use super::path::NodePath;
use crate::error::{Error, Result};

/// Settings shared by every node of one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionOptions {
    /// Name attached to the tree's log events.
    pub label: Option<String>,

    /// Deepest path a child node may be materialized at. `None` is unbounded.
    pub max_depth: Option<usize>,
}

impl ProjectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Load options from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Fail if a child of `parent` would sit deeper than the limit.
    pub(crate) fn check_depth(&self, parent: &NodePath) -> Result<()> {
        match self.max_depth {
            Some(limit) if parent.depth() + 1 > limit => Err(Error::DepthExceeded {
                path: parent.to_string(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}
