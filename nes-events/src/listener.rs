//! Listener records

use crate::error::ListenerError;
use crate::identity::ListenerId;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Type-erased listener callback
pub type Callback<E> = Box<dyn Fn(&mut E) -> Result<(), ListenerError> + Send + Sync>;

/// Type-erased handle to the instance a method listener is bound to
pub(crate) type Owner = Weak<dyn Any + Send + Sync>;

/// How a listener is attached when it is registered
pub(crate) enum Binding {
    /// Free function or closure
    Unbound,
    /// Method of a weakly held instance
    Method(InstanceAddr, Owner),
    /// Handler owned by a scoped guard
    Scoped,
}

/// State of a listener's bound instance at the start of an invocation
pub(crate) enum OwnerState {
    Unbound,
    Alive(Arc<dyn Any + Send + Sync>),
    Dropped,
}

/// Per-registration key, unique within one dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(pub(crate) u64);

/// Address of the instance a method listener is bound to.
///
/// Presentation only. Never used for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceAddr(usize);

impl InstanceAddr {
    pub(crate) fn of<T>(ptr: *const T) -> Self {
        Self(ptr as *const () as usize)
    }

    /// Synthetic address of a scoped guard's record
    pub(crate) fn scoped(key: ListenerKey) -> Self {
        Self(key.0 as usize)
    }
}

impl fmt::Display for InstanceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A registered listener
pub struct Listener<E> {
    instance: Option<InstanceAddr>,
    owner: Option<Owner>,
    callback: Callback<E>,
    id: ListenerId,
    key: ListenerKey,
}

impl<E> Listener<E> {
    pub(crate) fn new(
        instance: Option<InstanceAddr>,
        callback: Callback<E>,
        id: ListenerId,
        key: ListenerKey,
    ) -> Self {
        Self {
            instance,
            owner: None,
            callback,
            id,
            key,
        }
    }

    pub(crate) fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Invoke the callback
    pub fn invoke(&self, event: &mut E) -> Result<(), ListenerError> {
        (self.callback)(event)
    }

    /// Bound instance, `None` for free functions and closures
    pub fn instance(&self) -> Option<InstanceAddr> {
        self.instance
    }

    /// Handler identity
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn key(&self) -> ListenerKey {
        self.key
    }

    /// Pin the bound instance for the duration of an invocation
    pub(crate) fn owner_state(&self) -> OwnerState {
        match &self.owner {
            None => OwnerState::Unbound,
            Some(owner) => owner
                .upgrade()
                .map_or(OwnerState::Dropped, OwnerState::Alive),
        }
    }

    /// Whether the instance this listener is bound to has been dropped
    pub fn is_orphaned(&self) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.strong_count() == 0)
    }
}

impl<E> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("instance", &self.instance)
            .field("id", &self.id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Snapshot of one registered listener, for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerInfo<P> {
    /// Priority the listener is registered at
    pub priority: P,
    /// Handler identity
    pub id: ListenerId,
    /// Bound instance, if any
    pub instance: Option<InstanceAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_mutates_event() {
        let listener: Listener<u32> = Listener::new(
            None,
            Box::new(|n: &mut u32| {
                *n += 1;
                Ok(())
            }),
            ListenerId::from_raw(1),
            ListenerKey(0),
        );

        let mut n = 41;
        listener.invoke(&mut n).unwrap();
        assert_eq!(n, 42);
        assert!(listener.instance().is_none());
    }

    #[test]
    fn test_invoke_returns_error() {
        let listener: Listener<u32> = Listener::new(
            None,
            Box::new(|_| Err(ListenerError::failed("nope"))),
            ListenerId::from_raw(2),
            ListenerKey(1),
        );

        assert!(listener.invoke(&mut 0).is_err());
    }

    #[test]
    fn test_instance_addr() {
        let value = 5u8;
        let addr = InstanceAddr::of(&value as *const u8);
        assert_eq!(addr, InstanceAddr::of(&value as *const u8));
        assert!(addr.to_string().starts_with("0x"));
    }

    #[test]
    fn test_orphaned_once_owner_dropped() {
        let owner: Arc<dyn Any + Send + Sync> = Arc::new(3u8);
        let listener: Listener<u32> = Listener::new(
            Some(InstanceAddr::scoped(ListenerKey(2))),
            Box::new(|_| Ok(())),
            ListenerId::from_raw(3),
            ListenerKey(2),
        )
        .with_owner(Arc::downgrade(&owner));

        assert!(!listener.is_orphaned());
        assert!(matches!(listener.owner_state(), OwnerState::Alive(_)));

        drop(owner);
        assert!(listener.is_orphaned());
        assert!(matches!(listener.owner_state(), OwnerState::Dropped));
    }

    #[test]
    fn test_unbound_listener_is_never_orphaned() {
        let listener: Listener<u32> = Listener::new(
            None,
            Box::new(|_| Ok(())),
            ListenerId::from_raw(4),
            ListenerKey(3),
        );

        assert!(!listener.is_orphaned());
        assert!(matches!(listener.owner_state(), OwnerState::Unbound));
    }
}
