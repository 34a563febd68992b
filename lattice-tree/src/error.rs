//! Error types for projection trees.

use thiserror::Error;

/// Boxed error raised by caller-supplied derivation code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by projection reads and writes.
#[derive(Debug, Error)]
pub enum Error {
    /// A derivation failed. The caller's error is carried as-is and shows
    /// through unchanged at every level of the tree.
    #[error(transparent)]
    Derive(BoxError),

    /// A bubbled write reached a parent value that cannot hold named keys.
    #[error("cannot set `{key}` on a {found} value at `{path}`")]
    NotMergeable {
        path: String,
        key: String,
        found: &'static str,
    },

    /// Materializing a child would exceed the configured depth limit.
    #[error("projection depth limit of {limit} exceeded at `{path}`")]
    DepthExceeded { path: String, limit: usize },
}

impl Error {
    /// Wrap a derivation failure.
    ///
    /// Accepts any error type as well as plain messages (`&str`, `String`).
    pub fn derive(error: impl Into<BoxError>) -> Self {
        Error::Derive(error.into())
    }

    /// The caller's derivation error, if it has type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Derive(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
