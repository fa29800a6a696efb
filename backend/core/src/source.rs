use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::event::Event;

/// Callback invoked by a source for every delivered event of a subscribed kind.
pub type SourceCallback<E> = Arc<dyn Fn(E) + Send + Sync>;

/// The external event source a plugin manager attaches to.
///
/// Subscriptions for different kinds coexist independently. The only removal
/// primitive is `unsubscribe_all`. Implementations must not invoke a callback
/// from inside `subscribe` itself; delivery happens later, from the source's
/// own event loop.
pub trait EventSource<E: Event>: Send + Sync {
    /// Invoke `callback` for every event of `kind` from now on.
    fn subscribe(&self, kind: E::Kind, callback: SourceCallback<E>);

    /// Drop every active subscription on this source, regardless of kind.
    fn unsubscribe_all(&self);
}

/// In-process event source.
///
/// Events are pushed with [`LocalEventSource::emit`] and delivered synchronously
/// to every matching subscription, in subscription order.
pub struct LocalEventSource<E: Event> {
    subscriptions: RwLock<Vec<(E::Kind, SourceCallback<E>)>>,
}

impl<E: Event> LocalEventSource<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Deliver `event` to every subscription of its kind.
    /// Returns the number of callbacks reached.
    ///
    /// Callbacks are snapshotted first, so a callback may subscribe or
    /// unsubscribe this source while the event is being delivered.
    pub fn emit(&self, event: E) -> usize {
        let kind = event.kind();
        let targets: Vec<SourceCallback<E>> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        trace!(kind = ?kind, callbacks = targets.len(), "Emitting event");
        for cb in &targets {
            cb(event.clone());
        }
        targets.len()
    }

    /// Kinds with at least one live subscription.
    pub fn subscribed_kinds(&self) -> BTreeSet<E::Kind> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: Event> Default for LocalEventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventSource<E> for LocalEventSource<E> {
    fn subscribe(&self, kind: E::Kind, callback: SourceCallback<E>) {
        debug!(kind = ?kind, "Source subscription added");
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, callback));
    }

    fn unsubscribe_all(&self) {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(dropped = subs.len(), "Source subscriptions cleared");
        subs.clear();
    }
}
