// nes - Nuvola Event System
//
// Type-safe, priority-ordered event dispatch. Handlers are registered per
// event type and priority and run synchronously on the publishing thread.

// Re-export the dispatch engine
pub use nes_events::*;

/// Commonly used items
pub mod prelude {
    pub use nes_events::{
        Dispatcher, DispatchError, DispatcherConfig, EventDispatcher, EventDispatcherBuilder,
        EventHolder, EventPriority, ListenerError, ListenerId, Priority, ScopedListener,
        make_holder,
    };
}
