//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! When a signal or memo is read, it asks the context for the current
//! computation and registers that computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running a memo or effect pushes a
//! tracking frame carrying the computation's id and its invalidation
//! callback. Running a closure through [`untrack`] pushes an untracked frame,
//! which hides every tracking frame below it: reads made inside are not
//! recorded anywhere.
//!
//! Frames are popped by guards, so nested computations and early returns
//! through `?` leave the stack balanced.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

/// Callback invoked when one of a computation's dependencies changes.
pub type Invalidator = Arc<dyn Fn() + Send + Sync>;

/// Unique identifier for a computation that can depend on reactive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

enum Frame {
    Tracking {
        subscriber_id: SubscriberId,
        invalidate: Invalidator,
        /// Source ids read during this computation.
        dependencies: SmallVec<[u64; 8]>,
    },
    Untracked,
}

impl Frame {
    fn subscriber_id(&self) -> Option<SubscriberId> {
        match self {
            Frame::Tracking { subscriber_id, .. } => Some(*subscriber_id),
            Frame::Untracked => None,
        }
    }
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

/// Guard that pops its frame when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a tracking context for the given computation.
    ///
    /// Reads performed while the guard is alive register `invalidate` with
    /// the source being read.
    pub fn enter(subscriber_id: SubscriberId, invalidate: Invalidator) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(Frame::Tracking {
                subscriber_id,
                invalidate,
                dependencies: SmallVec::new(),
            });
        });

        Self {
            subscriber_id: Some(subscriber_id),
        }
    }

    /// Enter an untracked context. Reads made while the guard is alive do
    /// not subscribe the enclosing computation.
    pub fn untracked() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Frame::Untracked));
        Self {
            subscriber_id: None,
        }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            matches!(stack.borrow().last(), Some(Frame::Tracking { .. }))
        })
    }

    /// Get the current subscriber ID, if reads are being tracked.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(Frame::subscriber_id))
    }

    /// The running computation and its invalidation callback.
    pub(crate) fn current() -> Option<(SubscriberId, Invalidator)> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Tracking {
                subscriber_id,
                invalidate,
                ..
            }) => Some((*subscriber_id, Arc::clone(invalidate))),
            _ => None,
        })
    }

    /// Record that the running computation read the given source.
    pub fn track_dependency(source_id: u64) {
        CONTEXT_STACK.with(|stack| {
            if let Some(Frame::Tracking { dependencies, .. }) = stack.borrow_mut().last_mut() {
                if !dependencies.contains(&source_id) {
                    dependencies.push(source_id);
                }
            }
        });
    }

    /// Source ids read so far by the running computation.
    pub fn dependencies() -> Vec<u64> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(Frame::Tracking { dependencies, .. }) => dependencies.to_vec(),
            _ => Vec::new(),
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.subscriber_id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                frame.subscriber_id()
            );
        }
    }
}

/// Run `f` without subscribing the current computation to anything it reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _guard = ReactiveContext::untracked();
    f()
}
