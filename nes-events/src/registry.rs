//! Event dispatcher registry

use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchResult, ListenerError};
use crate::event::{EventHolder, EventPriority, Priority};
use crate::identity::ListenerId;
use crate::scoped::ScopedListener;
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

type DispatcherSlot = Arc<dyn Any + Send + Sync>;

/// Routes every operation to the dispatcher of its event type.
///
/// Dispatchers are created on first use and live as long as the registry.
/// Cloning the registry shares its dispatchers.
///
/// # Examples
///
/// ```rust
/// use nes_events::{EventDispatcher, EventPriority, make_holder};
///
/// #[derive(Default)]
/// struct Shutdown {
///     cancel: bool,
/// }
///
/// fn veto(event: &mut Shutdown) {
///     event.cancel = true;
/// }
///
/// let events = EventDispatcher::new();
/// events.listen_at::<Shutdown, _>(EventPriority::First, veto);
///
/// let mut event = make_holder(Shutdown::default());
/// events.trigger(&mut event).unwrap();
/// assert!(event.cancel);
/// ```
pub struct EventDispatcher<P: Priority = EventPriority> {
    dispatchers: Arc<DashMap<TypeId, DispatcherSlot>>,
    config: Arc<DispatcherConfig>,
    _priority: PhantomData<fn() -> P>,
}

impl EventDispatcher {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self::for_priority(config)
    }
}

impl<P: Priority> EventDispatcher<P> {
    /// Create a registry for a custom priority set
    pub fn for_priority(config: DispatcherConfig) -> Self {
        Self {
            dispatchers: Arc::new(DashMap::new()),
            config: Arc::new(config),
            _priority: PhantomData,
        }
    }

    /// Dispatcher for `E`, created on first call.
    ///
    /// Concurrent first calls create exactly one dispatcher. Once created,
    /// lookups only take a shard read lock.
    pub fn get<E: 'static>(&self) -> Arc<Dispatcher<E, P>> {
        let key = TypeId::of::<E>();
        let existing = self.dispatchers.get(&key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => self.create::<E>(key),
        };

        match slot.downcast::<Dispatcher<E, P>>() {
            Ok(dispatcher) => dispatcher,
            Err(_) => unreachable!("dispatcher slot is keyed by its event TypeId"),
        }
    }

    fn create<E: 'static>(&self, key: TypeId) -> DispatcherSlot {
        self.dispatchers
            .entry(key)
            .or_insert_with(|| {
                if self.config.enable_logging {
                    debug!(event = type_name::<E>(), "Created dispatcher");
                }
                Arc::new(Dispatcher::<E, P>::with_config(Arc::clone(&self.config)))
                    as DispatcherSlot
            })
            .value()
            .clone()
    }

    /// Register a handler for `E` at the default priority
    pub fn listen<E, H>(&self, handler: H) -> ListenerId
    where
        E: 'static,
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        self.get::<E>().listen(handler)
    }

    /// Register a handler for `E` at `priority`
    pub fn listen_at<E, H>(&self, priority: P, handler: H) -> ListenerId
    where
        E: 'static,
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        self.get::<E>().listen_at(priority, handler)
    }

    /// Register a fallible handler for `E` at `priority`
    pub fn try_listen_at<E, H>(&self, priority: P, handler: H) -> ListenerId
    where
        E: 'static,
        H: Fn(&mut E) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.get::<E>().try_listen_at(priority, handler)
    }

    /// Register a method of `instance` for `E` at the default priority
    pub fn listen_method<E, T, M>(&self, instance: &Arc<T>, method: M) -> ListenerId
    where
        E: 'static,
        T: Send + Sync + 'static,
        M: Fn(&T, &mut E) + Send + Sync + 'static,
    {
        self.get::<E>().listen_method(instance, method)
    }

    /// Register a method of `instance` for `E` at `priority`
    pub fn listen_method_at<E, T, M>(&self, priority: P, instance: &Arc<T>, method: M) -> ListenerId
    where
        E: 'static,
        T: Send + Sync + 'static,
        M: Fn(&T, &mut E) + Send + Sync + 'static,
    {
        self.get::<E>().listen_method_at(priority, instance, method)
    }

    /// Remove every registration of `handler`'s type for `E`
    pub fn deafen<E: 'static, H: 'static>(&self, handler: H) -> usize {
        self.get::<E>().deafen(handler)
    }

    /// Remove every listener of `E` with identity `id`
    pub fn deafen_id<E: 'static>(&self, id: ListenerId) -> usize {
        self.get::<E>().deafen_id(id)
    }

    /// Dispatch the held event to every listener of `E`
    pub fn trigger<E: 'static>(&self, holder: &mut EventHolder<E>) -> DispatchResult<()> {
        self.get::<E>().trigger(holder.get_mut())
    }

    /// Dispatch `event` and hand it back afterwards
    pub fn publish<E: 'static>(&self, event: E) -> DispatchResult<E> {
        let mut holder = EventHolder::new(event);
        self.trigger(&mut holder)?;
        Ok(holder.into_inner())
    }

    /// Guard keeping `handler` registered for `E` at the default priority
    pub fn scoped<E, H>(&self, handler: H) -> ScopedListener<E, P>
    where
        E: 'static,
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        self.get::<E>().scoped(handler)
    }

    /// Guard keeping `handler` registered for `E` at `priority`
    pub fn scoped_at<E, H>(&self, priority: P, handler: H) -> ScopedListener<E, P>
    where
        E: 'static,
        H: Fn(&mut E) + Send + Sync + 'static,
    {
        self.get::<E>().scoped_at(priority, handler)
    }

    /// Number of listeners for `E`
    pub fn listener_count<E: 'static>(&self) -> usize {
        let slot = self
            .dispatchers
            .get(&TypeId::of::<E>())
            .map(|slot| Arc::clone(slot.value()));

        slot.and_then(|slot| slot.downcast::<Dispatcher<E, P>>().ok())
            .map_or(0, |dispatcher| dispatcher.listener_count())
    }

    /// Whether a dispatcher for `E` has been created
    pub fn contains<E: 'static>(&self) -> bool {
        self.dispatchers.contains_key(&TypeId::of::<E>())
    }

    /// Number of dispatchers created so far
    pub fn dispatcher_count(&self) -> usize {
        self.dispatchers.len()
    }

    /// Configuration shared by every dispatcher
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl<P: Priority> Clone for EventDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            dispatchers: Arc::clone(&self.dispatchers),
            config: Arc::clone(&self.config),
            _priority: PhantomData,
        }
    }
}

impl<P: Priority> Default for EventDispatcher<P> {
    fn default() -> Self {
        Self::for_priority(DispatcherConfig::default())
    }
}

impl<P: Priority> fmt::Debug for EventDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("dispatchers", &self.dispatchers.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Event dispatcher builder
pub struct EventDispatcherBuilder {
    config: DispatcherConfig,
}

impl EventDispatcherBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
        }
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Enable/disable the warning for events nobody listens to
    pub fn warn_on_unhandled(mut self, enabled: bool) -> Self {
        self.config.warn_on_unhandled = enabled;
        self
    }

    /// Build a registry using the default priority set
    pub fn build(self) -> EventDispatcher {
        EventDispatcher::with_config(self.config)
    }

    /// Build a registry using a custom priority set
    pub fn build_with_priority<P: Priority>(self) -> EventDispatcher<P> {
        EventDispatcher::for_priority(self.config)
    }
}

impl Default for EventDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
