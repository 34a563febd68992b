//! Signal Implementation
//!
//! A Signal is the fundamental reactive cell. It holds a value and tracks
//! which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a tracking context (memo/effect), the
//!    signal stores that computation's invalidation callback.
//!
//! 2. When the signal is written, the stored callbacks are drained and
//!    invoked synchronously. Computations re-register on their next run, so
//!    a computation that stopped reading the signal stops being notified.
//!
//! 3. Explicit listeners added with [`Signal::subscribe`] persist until
//!    they are removed.
//!
//! Callbacks are always invoked with no lock held, so a callback may read
//! or write the same signal again.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::context::{Invalidator, ReactiveContext, SubscriberId};
use super::{Readable, Writable};

/// Counter shared by every reactive source (signals and memos).
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique source ID.
pub(crate) fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Subscribers = Arc<Mutex<IndexMap<SubscriberId, Invalidator>>>;

/// A reactive signal holding a value of type T.
///
/// Clones share the same value and subscribers.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
/// let value = count.get();
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: u64,
    value: Arc<RwLock<T>>,

    /// Computations that read this signal since the last write.
    dependents: Subscribers,

    /// Listeners registered through `subscribe`.
    listeners: Subscribers,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_source_id(),
            value: Arc::new(RwLock::new(value)),
            dependents: Arc::new(Mutex::new(IndexMap::new())),
            listeners: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value, subscribing the running computation.
    pub fn get(&self) -> T {
        if let Some((subscriber_id, invalidate)) = ReactiveContext::current() {
            ReactiveContext::track_dependency(self.id);
            self.dependents
                .lock()
                .entry(subscriber_id)
                .or_insert(invalidate);
        }

        self.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.notify();
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&*guard)
        };
        self.set(next);
    }

    /// Register a listener invoked after every write.
    pub fn subscribe<F>(&self, subscriber_id: SubscriberId, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.lock().insert(subscriber_id, Arc::new(notify));
    }

    /// Remove a listener or a tracked dependent.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.listeners.lock().shift_remove(&subscriber_id);
        self.dependents.lock().shift_remove(&subscriber_id);
    }

    /// Number of tracked dependents plus explicit listeners.
    pub fn subscriber_count(&self) -> usize {
        self.dependents.lock().len() + self.listeners.lock().len()
    }

    fn notify(&self) {
        let dependents = std::mem::take(&mut *self.dependents.lock());
        let listeners: Vec<Invalidator> = self.listeners.lock().values().cloned().collect();

        trace!(
            signal = self.id,
            dependents = dependents.len(),
            listeners = listeners.len(),
            "signal changed"
        );

        for (_, invalidate) in dependents {
            invalidate();
        }
        for notify in listeners {
            notify();
        }
    }
}

impl<T> Readable<T> for Signal<T>
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

impl<T> Writable<T> for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn write(&self, value: T) {
        self.set(value);
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            dependents: Arc::clone(&self.dependents),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
