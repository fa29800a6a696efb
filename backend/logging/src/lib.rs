//! Structured logging for Switchboard.
//!
//! Handles subscriber setup (console plus rolling NDJSON file) and the
//! registry lifecycle event log.

pub mod event_logger;
pub mod logger;

pub use event_logger::{EventLogEntry, EventLogger, RegistryEvent};
pub use logger::init_logger;
