//! Type-safe, priority-ordered event dispatch
//!
//! This crate provides synchronous, in-process publish/subscribe. Handlers are
//! registered per event type and priority; publishing runs every handler on the
//! calling thread, lowest priority first, each one receiving a mutable
//! reference to the same event instance.
//!
//! ## Features
//!
//! - **Typed** - Any `'static` type is an event, no trait required
//! - **Ordered** - Priority tiers, then registration order
//! - **Thread-safe** - Registration and dispatch may race from any thread
//! - **Scoped** - Guards that unsubscribe when dropped
//! - **Custom priorities** - Bring your own [`Priority`] enum
//!
//! ## Quick Start
//!
//! ```rust
//! use nes_events::*;
//!
//! // Define an event
//! #[derive(Debug, Default)]
//! struct DoorOpened {
//!     cancel: bool,
//!     log: Vec<&'static str>,
//! }
//!
//! // Define handlers
//! fn audit(event: &mut DoorOpened) {
//!     event.log.push("audit");
//! }
//!
//! fn lockdown(event: &mut DoorOpened) {
//!     event.log.push("lockdown");
//!     event.cancel = true;
//! }
//!
//! let events = EventDispatcher::new();
//! events.listen_at::<DoorOpened, _>(EventPriority::First, audit);
//! events.listen::<DoorOpened, _>(lockdown);
//!
//! let mut event = make_holder(DoorOpened::default());
//! events.trigger(&mut event).unwrap();
//!
//! assert!(event.cancel);
//! assert_eq!(event.log, vec!["audit", "lockdown"]);
//!
//! // Identity comes from the handler, so deafen takes the same function
//! events.deafen::<DoorOpened, _>(lockdown);
//! ```
//!
//! ## Methods and Instances
//!
//! ```rust
//! use nes_events::*;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! #[derive(Default)]
//! struct Frame;
//!
//! #[derive(Default)]
//! struct Renderer {
//!     frames: AtomicU32,
//! }
//!
//! impl Renderer {
//!     fn on_frame(&self, _frame: &mut Frame) {
//!         self.frames.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let events = EventDispatcher::new();
//! let left = Arc::new(Renderer::default());
//! let right = Arc::new(Renderer::default());
//!
//! events.listen_method::<Frame, _, _>(&left, Renderer::on_frame);
//! events.listen_method::<Frame, _, _>(&right, Renderer::on_frame);
//! events.publish(Frame).unwrap();
//!
//! // Both instances share one identity: a single deafen removes both
//! assert_eq!(events.deafen::<Frame, _>(Renderer::on_frame), 2);
//! ```
//!
//! ## Scoped Listeners
//!
//! ```rust
//! use nes_events::*;
//!
//! #[derive(Default)]
//! struct Tick(u32);
//!
//! let events = EventDispatcher::new();
//! {
//!     let _guard = events.scoped::<Tick, _>(|tick: &mut Tick| tick.0 += 1);
//!     assert_eq!(events.publish(Tick::default()).unwrap().0, 1);
//! }
//! assert_eq!(events.publish(Tick::default()).unwrap().0, 0);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use nes_events::*;
//!
//! #[derive(Default)]
//! struct Save;
//!
//! let events = EventDispatcher::new();
//! events.try_listen_at::<Save, _>(EventPriority::First, |_: &mut Save| {
//!     Err(ListenerError::cancelled("read-only volume"))
//! });
//!
//! match events.publish(Save) {
//!     Ok(_) => println!("All listeners ran"),
//!     Err(err) if err.is_cancelled() => eprintln!("Save vetoed: {}", err),
//!     Err(err) => eprintln!("Save failed: {}", err),
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use nes_events::EventDispatcherBuilder;
//!
//! let events = EventDispatcherBuilder::new()
//!     .enable_logging(true)       // Emit tracing events
//!     .warn_on_unhandled(true)    // Warn on events nobody listens to
//!     .build();
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod identity;
pub mod listener;
pub mod registry;
pub mod scoped;
pub mod store;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult, ListenerError};
pub use event::{EventHolder, EventPriority, Priority, make_holder};
pub use identity::{ListenerId, fnv1a_32};
pub use listener::{InstanceAddr, Listener, ListenerInfo};
pub use registry::{EventDispatcher, EventDispatcherBuilder};
pub use scoped::ScopedListener;
pub use store::{ListenerList, ListenerView};
