//! Event holders and priorities

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

/// Ordered tier controlling invocation sequence across listeners of one event type.
///
/// Dispatch visits priorities in ascending [`Ord`] order. A custom priority set is
/// configured at compile time by implementing this trait and naming the type as
/// the dispatcher's priority parameter.
///
/// # Examples
///
/// ```rust
/// use nes_events::Priority;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// enum Stage {
///     Immediate,
///     Normal,
///     Late,
/// }
///
/// impl Priority for Stage {
///     const DEFAULT: Self = Stage::Normal;
///     const ALL: &'static [Self] = &[Stage::Immediate, Stage::Normal, Stage::Late];
/// }
/// ```
pub trait Priority: Copy + Ord + Debug + Send + Sync + 'static {
    /// Priority used when a listener is registered without one
    const DEFAULT: Self;

    /// Every value of the priority type.
    ///
    /// Listening at a priority missing from this list is a programming error.
    const ALL: &'static [Self];
}

/// Default priority set
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    /// Runs before everything else
    First,
    /// Default tier
    #[default]
    Normal,
    /// Runs after everything else
    Last,
}

impl Priority for EventPriority {
    const DEFAULT: Self = EventPriority::Normal;
    const ALL: &'static [Self] = &[
        EventPriority::First,
        EventPriority::Normal,
        EventPriority::Last,
    ];
}

/// Owns one event instance for the duration of a dispatch.
///
/// Listeners only ever see a `&mut E` valid for the call; the holder keeps the
/// event so the publisher can inspect it afterwards (e.g. a cancel flag).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHolder<E> {
    event: E,
}

impl<E> EventHolder<E> {
    /// Wrap an event
    pub fn new(event: E) -> Self {
        Self { event }
    }

    /// Shared access to the event
    pub fn get(&self) -> &E {
        &self.event
    }

    /// Mutable access to the event
    pub fn get_mut(&mut self) -> &mut E {
        &mut self.event
    }

    /// Take the event back out of the holder
    pub fn into_inner(self) -> E {
        self.event
    }
}

impl<E> Deref for EventHolder<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.event
    }
}

impl<E> DerefMut for EventHolder<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.event
    }
}

impl<E> From<E> for EventHolder<E> {
    fn from(event: E) -> Self {
        Self::new(event)
    }
}

/// Create an event holder
pub fn make_holder<E>(event: E) -> EventHolder<E> {
    EventHolder::new(event)
}
