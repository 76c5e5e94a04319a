//! Error types for event dispatch.

use crate::identity::ListenerId;
use thiserror::Error;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Error returned by a fallible listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Listener failed
    #[error("Listener failed: {0}")]
    Failed(String),

    /// Listener asked to stop the remainder of the dispatch
    #[error("Dispatch cancelled: {0}")]
    Cancelled(String),

    /// Error from the listener's own domain
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ListenerError {
    /// Create a failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }
}

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener returned an error; the rest of the pass was skipped
    #[error("Listener {listener} for {event} at {priority} failed: {source}")]
    ListenerFailed {
        /// Event type name
        event: &'static str,
        /// Priority the listener was registered at
        priority: String,
        /// Identity of the failing listener
        listener: ListenerId,
        /// Error returned by the listener
        #[source]
        source: ListenerError,
    },
}

impl DispatchError {
    /// Error returned by the listener, if any
    pub fn listener_error(&self) -> &ListenerError {
        match self {
            Self::ListenerFailed { source, .. } => source,
        }
    }

    /// Whether the listener cancelled the dispatch
    pub fn is_cancelled(&self) -> bool {
        matches!(self.listener_error(), ListenerError::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_listener_error_display() {
        let err = ListenerError::failed("disk full");
        assert_eq!(err.to_string(), "Listener failed: disk full");

        let err = ListenerError::cancelled("user abort");
        assert!(err.to_string().contains("user abort"));
    }

    #[test]
    fn test_listener_error_from_boxed() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "pipe closed");
        let err: ListenerError = Box::<dyn std::error::Error + Send + Sync>::from(io).into();
        assert_eq!(err.to_string(), "pipe closed");
    }

    #[test]
    fn test_dispatch_error_source() {
        let err = DispatchError::ListenerFailed {
            event: "Tick",
            priority: "Normal".to_string(),
            listener: ListenerId::from_raw(1),
            source: ListenerError::cancelled("stop"),
        };

        assert!(err.is_cancelled());
        assert!(err.source().is_some());
        let display = err.to_string();
        assert!(display.contains("Tick"));
        assert!(display.contains("0x00000001"));
    }
}
