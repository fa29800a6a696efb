//! Plugin registry and dispatch engine.
//!
//! A [`PluginManager`] owns a set of named [`Plugin`]s and keeps the event
//! source subscribed to exactly the kinds those plugins handle. Plugins hold
//! handler slots addressed by [`EventIndex`] handles and are trimmed with a
//! [`RemovalSelector`].

pub mod handler;
pub mod index;
pub mod manager;
pub mod plugin;

pub use handler::{Dispatch, HandlerFuture};
pub use index::{EventIndex, RemovalSelector};
pub use manager::PluginManager;
pub use plugin::Plugin;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeSet;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use serde::Serialize;
    use switchboard_core::{Event, LocalEventSource};

    use crate::PluginManager;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
    pub enum Kind {
        Message,
        Join,
    }

    #[derive(Debug, Clone)]
    pub struct Msg {
        pub kind: Kind,
        pub text: String,
        pub tags: Vec<String>,
    }

    impl Event for Msg {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.kind
        }
    }

    pub fn msg(text: &str) -> Msg {
        Msg {
            kind: Kind::Message,
            text: text.to_string(),
            tags: Vec::new(),
        }
    }

    pub fn join(user: &str) -> Msg {
        Msg {
            kind: Kind::Join,
            text: user.to_string(),
            tags: Vec::new(),
        }
    }

    /// Returns `Pending` once (waking itself), then `Ready`.
    #[derive(Default)]
    pub struct YieldOnce {
        yielded: bool,
    }

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                return Poll::Ready(());
            }
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    pub fn kinds(list: &[Kind]) -> BTreeSet<Kind> {
        list.iter().copied().collect()
    }

    pub fn fixture() -> (PluginManager<Msg>, Arc<LocalEventSource<Msg>>) {
        let source = Arc::new(LocalEventSource::<Msg>::new());
        let manager = PluginManager::<Msg>::new(source.clone());
        (manager, source)
    }
}
