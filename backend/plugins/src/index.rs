/// Handler handles and removal selectors.
use serde::Serialize;
use switchboard_core::EventKind;

/// Identifies one handler slot inside one plugin.
///
/// Returned by registration and consumed by removal. It carries no reference
/// to the plugin that issued it; passing it to a different plugin clears
/// whatever that plugin holds at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventIndex<K> {
    kind: K,
    index: usize,
}

impl<K: EventKind> EventIndex<K> {
    pub(crate) fn new(kind: K, index: usize) -> Self {
        Self { kind, index }
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    /// Position in the plugin's slot list for [`Self::kind`].
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Which handlers a plugin should drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalSelector<K> {
    /// Every handler of every kind.
    All,
    /// Every handler of one kind.
    ByType(K),
    /// Exactly one slot. Out-of-range indices are ignored.
    ByHandle(EventIndex<K>),
    /// Each listed slot, in order.
    ByHandles(Vec<EventIndex<K>>),
}

impl<K> From<EventIndex<K>> for RemovalSelector<K> {
    fn from(handle: EventIndex<K>) -> Self {
        RemovalSelector::ByHandle(handle)
    }
}

impl<K> From<Vec<EventIndex<K>>> for RemovalSelector<K> {
    fn from(handles: Vec<EventIndex<K>>) -> Self {
        RemovalSelector::ByHandles(handles)
    }
}
