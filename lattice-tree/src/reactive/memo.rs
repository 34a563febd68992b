//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when one of its
//! dependencies changes.
//!
//! # How Memos Work
//!
//! 1. The computation does not run until the memo is first read.
//!
//! 2. While computing, the memo is the running computation: every signal or
//!    memo it reads stores the memo's invalidation callback.
//!
//! 3. When a dependency changes, the memo is marked dirty and in turn
//!    invalidates the computations that read it.
//!
//! 4. The next read recomputes.
//!
//! Memos that are never read again stay dirty; no work is wasted on them.

use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::context::{Invalidator, ReactiveContext, SubscriberId};
use super::signal::next_source_id;
use super::Readable;

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// The memo needs to recompute on next read.
    Dirty,
}

struct MemoInner<T> {
    id: u64,
    subscriber_id: SubscriberId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: RwLock<MemoState>,
    dependencies: RwLock<Vec<u64>>,
    dependents: Mutex<IndexMap<SubscriberId, Invalidator>>,
}

impl<T> MemoInner<T> {
    fn invalidate(&self) {
        *self.state.write() = MemoState::Dirty;

        let dependents = std::mem::take(&mut *self.dependents.lock());
        trace!(memo = self.id, dependents = dependents.len(), "memo invalidated");
        for (_, invalidate) in dependents {
            invalidate();
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// Clones share the cache and the dependency set.
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo. The computation runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MemoInner {
                id: next_source_id(),
                subscriber_id: SubscriberId::new(),
                compute: Box::new(compute),
                value: RwLock::new(None),
                state: RwLock::new(MemoState::Dirty),
                dependencies: RwLock::new(Vec::new()),
                dependents: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID this memo tracks its dependencies under.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        if let Some((subscriber_id, invalidate)) = ReactiveContext::current() {
            ReactiveContext::track_dependency(self.inner.id);
            self.inner
                .dependents
                .lock()
                .entry(subscriber_id)
                .or_insert(invalidate);
        }

        self.get_untracked()
    }

    /// Get the current value without subscribing the running computation.
    pub fn get_untracked(&self) -> T {
        if *self.inner.state.read() == MemoState::Clean {
            if let Some(value) = self.inner.value.read().as_ref() {
                return value.clone();
            }
        }
        self.recompute()
    }

    /// Mark the memo as needing recomputation.
    pub fn mark_dirty(&self) {
        self.inner.invalidate();
    }

    fn recompute(&self) -> T {
        let weak: Weak<MemoInner<T>> = Arc::downgrade(&self.inner);
        let invalidate: Invalidator = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.invalidate();
            }
        });

        // Clean before computing: a dependency written mid-computation
        // must leave the memo dirty.
        *self.inner.state.write() = MemoState::Clean;

        let (value, dependencies) = {
            let _ctx = ReactiveContext::enter(self.inner.subscriber_id, invalidate);
            let value = (self.inner.compute)();
            (value, ReactiveContext::dependencies())
        };

        trace!(
            memo = self.inner.id,
            dependencies = dependencies.len(),
            "memo recomputed"
        );
        *self.inner.dependencies.write() = dependencies;
        *self.inner.value.write() = Some(value.clone());
        value
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.read()
    }

    /// Number of sources read during the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.read().len()
    }

    /// Number of computations that read this memo since it last changed.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.lock().len()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Readable<T> for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn read(&self) -> T {
        self.get()
    }

    fn read_untracked(&self) -> T {
        self.get_untracked()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
