pub mod error;
pub mod event;
pub mod source;

pub use error::{Result, SwitchboardError};
pub use event::{DispatchOptions, Event, EventKind, FaultPolicy};
pub use source::{EventSource, LocalEventSource, SourceCallback};
