use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Discriminator identifying a category of events delivered by a source.
///
/// Blanket-implemented for any small copyable tag, usually a fieldless enum.
pub trait EventKind: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T> EventKind for T where T: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

/// A payload delivered by an event source.
///
/// Every handler receives its own copy produced by `Clone`, so the payload
/// type's `Clone` must be a full structural copy (no shared interior
/// mutability) for handlers to stay isolated from one another.
pub trait Event: Clone + Send + Sync + 'static {
    type Kind: EventKind;

    /// The kind this payload is routed under.
    fn kind(&self) -> Self::Kind;
}

/// What dispatch does when a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log the failure and keep delivering to the remaining handlers.
    #[default]
    Isolate,
    /// Let a handler panic unwind out of dispatch.
    Propagate,
}

/// Per-manager dispatch behaviour, fixed when the manager is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOptions {
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    /// Emit a debug record for every handler invocation.
    #[serde(default)]
    pub trace_invocations: bool,
}

impl std::fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    enum Kind {
        Message,
    }

    #[derive(Debug, Clone)]
    struct Message {
        text: String,
    }

    impl Event for Message {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            Kind::Message
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let first = Message { text: "hi".into() };
        let mut copy = first.clone();
        copy.text.push('!');
        assert_eq!(first.text, "hi");
        assert_eq!(copy.kind(), Kind::Message);
    }

    #[test]
    fn test_fault_policy_default_and_display() {
        assert_eq!(FaultPolicy::default(), FaultPolicy::Isolate);
        assert_eq!(FaultPolicy::Isolate.to_string(), "isolate");
        assert_eq!(FaultPolicy::Propagate.to_string(), "propagate");
    }

    #[test]
    fn test_fault_policy_deserialization() {
        let policy: FaultPolicy = serde_json::from_str("\"propagate\"").unwrap();
        assert_eq!(policy, FaultPolicy::Propagate);
    }

    #[test]
    fn test_dispatch_options_partial_json() {
        let opts: DispatchOptions = serde_json::from_value(serde_json::json!({
            "traceInvocations": true
        }))
        .unwrap();
        assert_eq!(opts.fault_policy, FaultPolicy::Isolate);
        assert!(opts.trace_invocations);
    }
}
