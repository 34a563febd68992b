//! Reactive Primitives
//!
//! This module implements the reactive cells a projection tree is built on:
//! signals, memos, and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a memo or effect), the signal registers that
//! context as a dependent and notifies it on the next write.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and recomputes lazily
//! after one of its dependencies changes.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change.
//!
//! # Cells
//!
//! Projections only depend on the narrow [`Readable`] and [`Writable`]
//! traits, so any host cell can back a tree. Dependency tracking uses a
//! thread-local context stack; [`untrack`] suspends tracking for a closure.

mod context;
mod effect;
mod memo;
mod signal;

pub use context::{untrack, Invalidator, ReactiveContext, SubscriberId};
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use signal::Signal;

/// A reactive cell that can be read.
pub trait Readable<T>: Send + Sync {
    /// Read the value, subscribing the running computation.
    fn read(&self) -> T;

    /// Read the value without subscribing anything.
    fn read_untracked(&self) -> T;
}

/// A reactive cell that can also be written.
pub trait Writable<T>: Readable<T> {
    /// Replace the value and notify dependents.
    fn write(&self, value: T);
}
