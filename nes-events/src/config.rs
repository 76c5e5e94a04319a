//! Dispatcher configuration

use serde::{Deserialize, Serialize};

/// Dispatcher configuration
///
/// Shared by a registry and every dispatcher it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Emit `tracing` events for registration, removal and dispatch
    pub enable_logging: bool,

    /// Warn when an event is triggered with no listeners registered
    pub warn_on_unhandled: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            warn_on_unhandled: false,
        }
    }
}

impl DispatcherConfig {
    /// Configuration with all logging disabled
    pub fn quiet() -> Self {
        Self {
            enable_logging: false,
            warn_on_unhandled: false,
        }
    }
}
