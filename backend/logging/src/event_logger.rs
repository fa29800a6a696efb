//! Registry Event Logger
//!
//! Structured lifecycle events (installs, resubscriptions, handler faults)
//! emitted through `tracing` on the `registry_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    PluginInstalled {
        name: String,
    },
    PluginReplaced {
        name: String,
    },
    PluginRemoved {
        name: String,
    },
    PluginsCleared {
        count: usize,
    },
    Resubscribed {
        kinds: Vec<String>,
    },
    HandlerFailed {
        kind: String,
        index: usize,
        error: String,
    },
    HandlerPanicked {
        kind: String,
        index: usize,
    },
}

impl RegistryEvent {
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            RegistryEvent::HandlerFailed { .. } | RegistryEvent::HandlerPanicked { .. }
        )
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: RegistryEvent,
}

impl EventLogEntry {
    pub fn new(event: RegistryEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }

    /// NDJSON line for this entry.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Emits a registry event; handler faults go out at `warn`, everything else at `info`.
    pub fn log_event(event: RegistryEvent) {
        let entry = EventLogEntry::new(event);
        if entry.event.is_fault() {
            warn!(target: "registry_events", event = %entry.to_json(), "Registry fault");
        } else {
            info!(target: "registry_events", event = %entry.to_json(), "Registry event");
        }
    }
}
