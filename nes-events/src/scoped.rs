//! Scope-bound subscriptions

use crate::dispatcher::Dispatcher;
use crate::event::{EventPriority, Priority};
use crate::identity::ListenerId;
use crate::listener::{Binding, Callback, InstanceAddr, ListenerKey};
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Keeps a handler registered for as long as the guard lives.
///
/// Dropping the guard (scope exit, early return or unwinding) removes exactly
/// the listener it registered, even if other guards wrap the same handler type.
/// Removal waits for any dispatch pass currently running the guard's priority
/// bucket, so once the drop returns the handler is never invoked again.
///
/// The guard refers to its dispatcher weakly and never keeps it alive. Its
/// record carries a synthetic instance address, so
/// [`Dispatcher::listeners`] tells guards apart from plain closures.
///
/// Dropping a guard from inside a listener dispatched from the same bucket
/// deadlocks.
///
/// # Examples
///
/// ```rust
/// use nes_events::{Dispatcher, EventPriority};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Saved {
///     hits: u32,
/// }
///
/// let dispatcher: Arc<Dispatcher<Saved>> = Arc::new(Dispatcher::new());
/// {
///     let _guard = dispatcher.scoped_at(EventPriority::First, |e: &mut Saved| e.hits += 1);
///     assert_eq!(dispatcher.listener_count(), 1);
/// }
/// assert_eq!(dispatcher.listener_count(), 0);
/// ```
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct ScopedListener<E: 'static, P: Priority = EventPriority> {
    dispatcher: Weak<Dispatcher<E, P>>,
    key: Option<ListenerKey>,
    id: ListenerId,
    priority: P,
}

impl<E: 'static, P: Priority> ScopedListener<E, P> {
    /// Register `handler` at `priority` on `dispatcher`
    pub fn new<H>(dispatcher: &Arc<Dispatcher<E, P>>, priority: P, handler: H) -> Self
    where
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        let id = ListenerId::of::<H>();
        let callback: Callback<E> = Box::new(move |event| {
            handler(event);
            Ok(())
        });
        let key = dispatcher.register(priority, Binding::Scoped, callback, id);

        Self {
            dispatcher: Arc::downgrade(dispatcher),
            key: Some(key),
            id,
            priority,
        }
    }

    /// Remove the listener now.
    ///
    /// Returns `true` if this call removed it. Later calls, and calls after a
    /// manual `deafen` of the same handler, do nothing.
    pub fn retire(&mut self) -> bool {
        let Some(key) = self.key.take() else {
            return false;
        };
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            return false;
        };

        let removed = dispatcher.remove_key(self.priority, key);
        if dispatcher.config().enable_logging {
            debug!(
                event = type_name::<E>(),
                priority = ?self.priority,
                listener = %self.id,
                removed,
                "Retired scoped listener"
            );
        }
        removed
    }

    /// Whether the guard has not been retired yet
    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }

    /// Instance address of the guard's record, `None` once retired
    pub fn instance(&self) -> Option<InstanceAddr> {
        self.key.map(InstanceAddr::scoped)
    }

    /// Identity of the wrapped handler
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Priority the handler is registered at
    pub fn priority(&self) -> P {
        self.priority
    }
}

impl<E: 'static, P: Priority> Drop for ScopedListener<E, P> {
    fn drop(&mut self) {
        self.retire();
    }
}

impl<E: 'static, P: Priority> fmt::Debug for ScopedListener<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedListener")
            .field("event", &type_name::<E>())
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[derive(Debug, Default)]
    struct Ping {
        hits: u32,
    }

    fn on_ping(ping: &mut Ping) {
        ping.hits += 1;
    }

    fn dispatcher() -> Arc<Dispatcher<Ping>> {
        Arc::new(Dispatcher::with_config(Arc::new(DispatcherConfig::quiet())))
    }

    fn hits(d: &Dispatcher<Ping>) -> u32 {
        let mut ping = Ping::default();
        d.trigger(&mut ping).unwrap();
        ping.hits
    }

    #[test]
    fn test_nested_guards() {
        let d = dispatcher();
        let g1 = d.scoped(on_ping);
        {
            let _g2 = d.scoped(on_ping);
            assert_eq!(hits(&d), 2);
        }
        assert_eq!(hits(&d), 1);
        drop(g1);
        assert_eq!(hits(&d), 0);
    }

    #[test]
    fn test_retire_is_idempotent() {
        let d = dispatcher();
        let mut guard = d.scoped_at(EventPriority::Last, on_ping);
        assert!(guard.is_active());
        assert_eq!(guard.priority(), EventPriority::Last);

        assert!(guard.retire());
        assert!(!guard.is_active());
        assert!(!guard.retire());
        assert_eq!(hits(&d), 0);
    }

    #[test]
    fn test_drop_after_manual_deafen() {
        let d = dispatcher();
        let guard = d.scoped(on_ping);
        d.listen(on_ping);

        assert_eq!(guard.id(), ListenerId::of_val(&on_ping));
        assert_eq!(d.deafen(on_ping), 2);

        drop(guard);
        assert!(d.is_empty());
    }

    #[test]
    fn test_guard_does_not_keep_dispatcher_alive() {
        let d = dispatcher();
        let mut guard = d.scoped(on_ping);
        let weak = Arc::downgrade(&d);

        drop(d);
        assert!(weak.upgrade().is_none());
        assert!(!guard.retire());
    }

    #[test]
    fn test_guard_removed_on_unwind() {
        let d = dispatcher();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = d.scoped(on_ping);
            assert_eq!(d.listener_count(), 1);
            panic!("owner failed");
        }));

        assert!(result.is_err());
        assert!(d.is_empty());
    }

    #[test]
    fn test_guards_visible_in_listeners() {
        let d = dispatcher();
        d.listen(on_ping);
        let mut first = d.scoped(on_ping);
        let second = d.scoped(on_ping);

        let infos = d.listeners();
        assert_eq!(infos.len(), 3);
        assert!(infos[0].instance.is_none());
        assert_eq!(infos[1].instance, first.instance());
        assert_eq!(infos[2].instance, second.instance());
        assert!(first.instance().is_some());
        assert_ne!(first.instance(), second.instance());
        assert!(infos.iter().all(|info| info.id == ListenerId::of_val(&on_ping)));

        first.retire();
        assert!(first.instance().is_none());
        let remaining: Vec<_> = d.listeners().iter().map(|info| info.instance).collect();
        assert_eq!(remaining, vec![None, second.instance()]);
    }

    struct Owner {
        _subscription: ScopedListener<Ping>,
    }

    #[test]
    fn test_guard_tied_to_owner() {
        let d = dispatcher();
        let owner = Owner {
            _subscription: d.scoped(on_ping),
        };
        assert_eq!(hits(&d), 1);

        drop(owner);
        assert_eq!(hits(&d), 0);
    }
}
