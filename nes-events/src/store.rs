//! Concurrency-safe listener storage
//!
//! One [`ListenerList`] exists per (event type, priority). Dispatch holds a
//! shared view for the whole priority pass; registration and removal take the
//! exclusive lock. The lock is writer-preferring: a queued mutation blocks new
//! views until it completes, and waits for every outstanding view to drop.

use crate::listener::Listener;
use parking_lot::{RwLock, RwLockReadGuard};

/// Ordered listener sequence behind a reader/writer lock
pub struct ListenerList<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> ListenerList<E> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Append a listener at the end
    pub fn append(&self, listener: Listener<E>) {
        self.listeners.write().push(listener);
    }

    /// Remove every listener matching `pred`, keeping survivors in order
    pub fn remove_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&Listener<E>) -> bool,
    {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| !pred(listener));
        before - listeners.len()
    }

    /// Like [`remove_where`](Self::remove_where), but gives up instead of
    /// waiting when the list is locked
    pub fn try_remove_where<F>(&self, mut pred: F) -> Option<usize>
    where
        F: FnMut(&Listener<E>) -> bool,
    {
        let mut listeners = self.listeners.try_write()?;
        let before = listeners.len();
        listeners.retain(|listener| !pred(listener));
        Some(before - listeners.len())
    }

    /// Take a read view of the current listeners.
    ///
    /// Mutations of this list block until the view is dropped.
    pub fn snapshot(&self) -> ListenerView<'_, E> {
        ListenerView {
            guard: self.listeners.read(),
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared view over a [`ListenerList`]
pub struct ListenerView<'a, E> {
    guard: RwLockReadGuard<'a, Vec<Listener<E>>>,
}

impl<E> ListenerView<'_, E> {
    /// Iterate listeners in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Listener<E>> {
        self.guard.iter()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl<'v, E> IntoIterator for &'v ListenerView<'_, E> {
    type Item = &'v Listener<E>;
    type IntoIter = std::slice::Iter<'v, Listener<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
