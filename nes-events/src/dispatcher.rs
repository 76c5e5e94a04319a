//! Per-event-type dispatcher

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult, ListenerError};
use crate::event::{EventPriority, Priority};
use crate::identity::ListenerId;
use crate::listener::{
    Binding, Callback, InstanceAddr, Listener, ListenerInfo, ListenerKey, OwnerState,
};
use crate::scoped::ScopedListener;
use crate::store::ListenerList;
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Owns every listener of one event type, bucketed by priority.
///
/// # Re-entrancy
///
/// `trigger` holds a read view of each priority bucket while that bucket's
/// listeners run. From inside a listener of `E`:
///
/// - `deafen`/`clear` on the same dispatcher deadlock (they lock every bucket),
/// - `listen` or dropping a [`ScopedListener`] deadlocks when it targets the
///   bucket currently being dispatched,
/// - a nested `trigger` of `E` deadlocks if a mutation is queued on that bucket.
///
/// Method listeners pin their instance for the whole pass of their priority
/// and release it after the bucket is unlocked, so an instance whose last
/// other owner goes away mid-dispatch is dropped outside the lock and its
/// `Drop` may call `deafen`.
///
/// A slow listener also stalls registration and removal on its bucket until it
/// returns.
pub struct Dispatcher<E: 'static, P: Priority = EventPriority> {
    listeners: BTreeMap<P, ListenerList<E>>,
    next_key: AtomicU64,
    config: Arc<DispatcherConfig>,
}

impl<E: 'static, P: Priority> Dispatcher<E, P> {
    /// Create a dispatcher with default configuration
    pub fn new() -> Self {
        Self::with_config(Arc::new(DispatcherConfig::default()))
    }

    /// Create a dispatcher sharing the given configuration
    pub fn with_config(config: Arc<DispatcherConfig>) -> Self {
        Self {
            listeners: P::ALL
                .iter()
                .map(|priority| (*priority, ListenerList::new()))
                .collect(),
            next_key: AtomicU64::new(0),
            config,
        }
    }

    fn bucket(&self, priority: P) -> &ListenerList<E> {
        match self.listeners.get(&priority) {
            Some(bucket) => bucket,
            None => panic!("priority {priority:?} is missing from Priority::ALL"),
        }
    }

    pub(crate) fn register(
        &self,
        priority: P,
        binding: Binding,
        callback: Callback<E>,
        id: ListenerId,
    ) -> ListenerKey {
        let key = ListenerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        let listener = match binding {
            Binding::Unbound => Listener::new(None, callback, id, key),
            Binding::Method(addr, owner) => {
                Listener::new(Some(addr), callback, id, key).with_owner(owner)
            }
            Binding::Scoped => Listener::new(Some(InstanceAddr::scoped(key)), callback, id, key),
        };
        self.bucket(priority).append(listener);

        if self.config.enable_logging {
            debug!(
                event = type_name::<E>(),
                ?priority,
                listener = %id,
                "Registered listener"
            );
        }

        key
    }

    /// Register a handler at the default priority
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nes_events::Dispatcher;
    ///
    /// #[derive(Default)]
    /// struct Tick {
    ///     count: u32,
    /// }
    ///
    /// fn on_tick(tick: &mut Tick) {
    ///     tick.count += 1;
    /// }
    ///
    /// let dispatcher: Dispatcher<Tick> = Dispatcher::new();
    /// dispatcher.listen(on_tick);
    ///
    /// let mut tick = Tick::default();
    /// dispatcher.trigger(&mut tick).unwrap();
    /// assert_eq!(tick.count, 1);
    /// ```
    pub fn listen<H>(&self, handler: H) -> ListenerId
    where
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        self.listen_at(P::DEFAULT, handler)
    }

    /// Register a handler at `priority`
    pub fn listen_at<H>(&self, priority: P, handler: H) -> ListenerId
    where
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        let id = ListenerId::of::<H>();
        let callback: Callback<E> = Box::new(move |event| {
            handler(event);
            Ok(())
        });
        self.register(priority, Binding::Unbound, callback, id);
        id
    }

    /// Register a fallible handler at `priority`.
    ///
    /// An `Err` aborts the rest of the dispatch pass and is returned from `trigger`.
    pub fn try_listen_at<H>(&self, priority: P, handler: H) -> ListenerId
    where
        H: Fn(&mut E) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = ListenerId::of::<H>();
        self.register(priority, Binding::Unbound, Box::new(handler), id);
        id
    }

    /// Register a method bound to `instance` at the default priority
    pub fn listen_method<T, M>(&self, instance: &Arc<T>, method: M) -> ListenerId
    where
        T: Send + Sync + 'static,
        M: Fn(&T, &mut E) + Send + Sync + 'static,
    {
        self.listen_method_at(P::DEFAULT, instance, method)
    }

    /// Register a method bound to `instance` at `priority`.
    ///
    /// The identity comes from the method alone, so the same method bound to
    /// two instances is removed by a single `deafen`. The instance is held
    /// weakly: once it is dropped the listener is skipped, and the next
    /// `trigger` that finds it dropped removes the record.
    ///
    /// A dispatch running the method keeps the instance alive until its
    /// priority pass ends. If every other reference is gone by then, the
    /// instance is dropped on the dispatching thread after the bucket lock is
    /// released.
    pub fn listen_method_at<T, M>(&self, priority: P, instance: &Arc<T>, method: M) -> ListenerId
    where
        T: Send + Sync + 'static,
        M: Fn(&T, &mut E) + Send + Sync + 'static,
    {
        let id = ListenerId::of::<M>();
        let addr = InstanceAddr::of(Arc::as_ptr(instance));
        let erased: Arc<dyn Any + Send + Sync> = Arc::<T>::clone(instance);
        let owner = Arc::downgrade(&erased);
        let weak = Arc::downgrade(instance);
        let callback: Callback<E> = Box::new(move |event| {
            if let Some(instance) = weak.upgrade() {
                method(&instance, event);
            }
            Ok(())
        });
        self.register(priority, Binding::Method(addr, owner), callback, id);
        id
    }

    /// Create a guard that keeps `handler` registered at the default priority
    /// until it is dropped
    pub fn scoped<H>(self: &Arc<Self>, handler: H) -> ScopedListener<E, P>
    where
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        ScopedListener::new(self, P::DEFAULT, handler)
    }

    /// Create a guard that keeps `handler` registered at `priority` until it
    /// is dropped
    pub fn scoped_at<H>(self: &Arc<Self>, priority: P, handler: H) -> ScopedListener<E, P>
    where
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        ScopedListener::new(self, priority, handler)
    }

    /// Remove every registration of `handler`'s type from every priority.
    ///
    /// Returns the number of listeners removed. Removing a handler that is not
    /// registered is a no-op.
    pub fn deafen<H: 'static>(&self, _handler: H) -> usize {
        self.deafen_id(ListenerId::of::<H>())
    }

    /// Remove every listener with identity `id` from every priority
    pub fn deafen_id(&self, id: ListenerId) -> usize {
        let removed: usize = self
            .listeners
            .values()
            .map(|bucket| bucket.remove_where(|listener| listener.id() == id))
            .sum();

        if self.config.enable_logging {
            debug!(
                event = type_name::<E>(),
                listener = %id,
                removed,
                "Deafened listener"
            );
        }

        removed
    }

    pub(crate) fn remove_key(&self, priority: P, key: ListenerKey) -> bool {
        self.bucket(priority)
            .remove_where(|listener| listener.key() == key)
            > 0
    }

    /// Remove every listener of this event type
    pub fn clear(&self) -> usize {
        let removed: usize = self
            .listeners
            .values()
            .map(|bucket| bucket.remove_where(|_| true))
            .sum();

        if self.config.enable_logging {
            debug!(event = type_name::<E>(), removed, "Cleared listeners");
        }

        removed
    }

    /// Dispatch `event` to every listener.
    ///
    /// Priorities are visited in ascending order, listeners of one priority in
    /// registration order. Each priority takes its own view when its pass
    /// starts, so a listener registered concurrently is seen either by the
    /// whole pass of its priority or not at all.
    ///
    /// The first listener error stops the dispatch and is returned. A panicking
    /// listener unwinds through this call.
    ///
    /// Records of method listeners whose instance is gone are skipped and then
    /// removed once their priority pass ends, unless the bucket is locked
    /// elsewhere (a later pass retries).
    pub fn trigger(&self, event: &mut E) -> DispatchResult<()> {
        if self.config.enable_logging {
            trace!(event = type_name::<E>(), "Triggering event");
        }

        if self.config.warn_on_unhandled && self.is_empty() {
            warn!(event = type_name::<E>(), "No listeners registered for event");
        }

        for (priority, bucket) in &self.listeners {
            // declared before the view so pinned instances drop after the unlock
            let mut pinned = Vec::new();
            let mut orphaned = false;
            let view = bucket.snapshot();
            for listener in &view {
                match listener.owner_state() {
                    OwnerState::Unbound => {}
                    OwnerState::Alive(owner) => pinned.push(owner),
                    OwnerState::Dropped => {
                        orphaned = true;
                        continue;
                    }
                }

                if let Err(source) = listener.invoke(event) {
                    if self.config.enable_logging {
                        debug!(
                            event = type_name::<E>(),
                            ?priority,
                            listener = %listener.id(),
                            error = %source,
                            "Listener failed, aborting dispatch"
                        );
                    }

                    return Err(DispatchError::ListenerFailed {
                        event: type_name::<E>(),
                        priority: format!("{priority:?}"),
                        listener: listener.id(),
                        source,
                    });
                }
            }
            drop(view);
            drop(pinned);

            if orphaned {
                self.prune(*priority, bucket);
            }
        }

        Ok(())
    }

    fn prune(&self, priority: P, bucket: &ListenerList<E>) {
        let Some(removed) = bucket.try_remove_where(Listener::is_orphaned) else {
            return;
        };

        if self.config.enable_logging && removed > 0 {
            debug!(
                event = type_name::<E>(),
                ?priority,
                removed,
                "Pruned listeners of dropped instances"
            );
        }
    }

    /// Total number of listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(ListenerList::len).sum()
    }

    /// Number of listeners at `priority`
    pub fn listener_count_at(&self, priority: P) -> usize {
        self.bucket(priority).len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.values().all(ListenerList::is_empty)
    }

    /// Snapshot of registered listeners in dispatch order
    pub fn listeners(&self) -> Vec<ListenerInfo<P>> {
        let mut infos = Vec::new();
        for (priority, bucket) in &self.listeners {
            infos.extend(bucket.snapshot().iter().map(|listener| ListenerInfo {
                priority: *priority,
                id: listener.id(),
                instance: listener.instance(),
            }));
        }
        infos
    }

    /// Configuration in use
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl<E: 'static, P: Priority> Default for Dispatcher<E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static, P: Priority> fmt::Debug for Dispatcher<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("event", &type_name::<E>())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
