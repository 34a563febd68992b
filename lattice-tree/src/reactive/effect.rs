//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever one of
//! its dependencies changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs immediately to establish its
//!    dependencies (unless created with [`Effect::new_lazy`]).
//!
//! 2. When a dependency changes, the effect re-runs synchronously inside
//!    the write that changed it, collecting a fresh set of dependencies.
//!
//! 3. Dropping the last handle or calling [`Effect::dispose`] stops it.
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (compute on access); effects are eager.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::context::{Invalidator, ReactiveContext, SubscriberId};

struct EffectInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn() + Send + Sync>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(self: &Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(self);
        let rerun: Invalidator = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.execute();
            }
        });

        let _ctx = ReactiveContext::enter(self.subscriber_id, rerun);
        (self.run)();
        let runs = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(
            effect = ?self.subscriber_id,
            runs,
            dependencies = ReactiveContext::dependencies().len(),
            "effect ran"
        );
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
/// let source = count.clone();
/// let _effect = Effect::new(move || println!("Count is: {}", source.get()));
///
/// count.set(5); // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect and run it once.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(EffectInner {
                subscriber_id: SubscriberId::new(),
                run: Box::new(run),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Run the effect now, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Stop the effect. Pending and future notifications are ignored.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_immediately() {
        let effect = Effect::new(|| {});
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn lazy_effect_waits_for_execute() {
        let effect = Effect::new_lazy(|| {});
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_on_signal_write() {
        let signal = Signal::new(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let source = signal.clone();
        let sink = observed.clone();
        let effect = Effect::new(move || {
            sink.store(source.get(), Ordering::SeqCst);
        });
        assert_eq!(observed.load(Ordering::SeqCst), 0);

        signal.set(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let effect = Effect::new(move || {
            source.get();
        });

        effect.dispose();
        signal.set(1);
        effect.execute();

        assert!(effect.is_disposed());
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn dropped_effect_stops_running() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let source = signal.clone();
        let counter = runs.clone();
        let effect = Effect::new(move || {
            source.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(effect);

        signal.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
