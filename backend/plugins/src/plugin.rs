/// A plugin: a named-by-its-manager bundle of typed event handlers.
///
/// Handlers live in per-kind slot lists. Removing a handler leaves a tombstone
/// (`None`) in its slot so every other issued [`EventIndex`] keeps pointing at
/// the same handler; the next registration for that kind reuses the first
/// tombstone. Every mutation asks the owning manager to resubscribe.
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use futures::FutureExt;
use switchboard_core::{DispatchOptions, Event, EventSource, Result, SwitchboardError};
use tracing::debug;

use crate::handler::{self, Dispatch, Handler, HandlerFuture};
use crate::index::{EventIndex, RemovalSelector};
use crate::manager::{ManagerShared, PluginManager};

type SlotTable<E> = HashMap<<E as Event>::Kind, Vec<Option<Handler<E>>>>;

pub(crate) struct PluginInner<E: Event> {
    slots: Mutex<SlotTable<E>>,
    manager: Weak<ManagerShared<E>>,
    manager_id: u64,
    options: DispatchOptions,
}

/// Cheap to clone; clones share the same handler table.
pub struct Plugin<E: Event> {
    inner: Arc<PluginInner<E>>,
}

impl<E: Event> Clone for Plugin<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Event> Plugin<E> {
    /// Create an empty plugin bound to `manager` for its whole life.
    ///
    /// The binding is non-owning; the plugin does not keep the manager alive.
    pub fn new(manager: &PluginManager<E>) -> Self {
        let shared = manager.shared();
        Self {
            inner: Arc::new(PluginInner {
                slots: Mutex::new(HashMap::new()),
                manager: Arc::downgrade(shared),
                manager_id: shared.id(),
                options: shared.options(),
            }),
        }
    }

    /// The source of the owning manager.
    ///
    /// Fails with [`SwitchboardError::ManagerDropped`] once the manager is gone.
    pub fn source(&self) -> Result<Arc<dyn EventSource<E>>> {
        self.manager()
            .map(|m| m.source())
            .ok_or(SwitchboardError::ManagerDropped)
    }

    pub fn manager(&self) -> Option<PluginManager<E>> {
        self.inner.manager.upgrade().map(PluginManager::from_shared)
    }

    pub(crate) fn manager_id(&self) -> u64 {
        self.inner.manager_id
    }

    pub(crate) fn same_as(&self, other: &Plugin<E>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register an async handler for `kind`.
    pub fn register<F, Fut>(&self, kind: E::Kind, f: F) -> EventIndex<E::Kind>
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.insert(kind, handler::from_async(f))
    }

    /// Register a handler that finishes its work before returning.
    pub fn register_sync<F>(&self, kind: E::Kind, f: F) -> EventIndex<E::Kind>
    where
        F: Fn(E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(kind, handler::from_sync(f))
    }

    /// Register a handler that removes itself after its first invocation.
    ///
    /// With `strict`, the slot is freed only after `f`'s future completes, so
    /// anything `f` does (including registering more handlers) happens first.
    /// Without it, the slot is freed as soon as the handler is invoked and
    /// `f`'s completion runs on independently.
    pub fn register_once<F, Fut>(&self, kind: E::Kind, f: F, strict: bool) -> EventIndex<E::Kind>
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let own: Arc<OnceLock<EventIndex<E::Kind>>> = Arc::new(OnceLock::new());
        let released = Arc::new(AtomicBool::new(false));
        let plugin = Arc::downgrade(&self.inner);
        let slot = Arc::clone(&own);

        let wrapper = move |event: E| -> HandlerFuture {
            let fut = f(event);
            let release = Release {
                plugin: plugin.clone(),
                slot: Arc::clone(&slot),
                released: Arc::clone(&released),
            };
            if strict {
                // Dropping the future early (or unwinding out of it) still
                // frees the slot through `Release`'s drop.
                async move {
                    let result = fut.await;
                    drop(release);
                    result
                }
                .boxed()
            } else {
                drop(release);
                fut.boxed()
            }
        };

        let index = self.insert(kind, Arc::new(wrapper));
        // `own` is fresh and private to this call, so this is the only set.
        let _ = own.set(index);
        index
    }

    fn insert(&self, kind: E::Kind, handler: Handler<E>) -> EventIndex<E::Kind> {
        let index = {
            let mut slots = self.slots();
            let list = slots.entry(kind).or_default();
            match list.iter().position(Option::is_none) {
                Some(free) => {
                    list[free] = Some(handler);
                    free
                }
                None => {
                    list.push(Some(handler));
                    list.len() - 1
                }
            }
        };
        debug!(kind = ?kind, index, "Handler registered");
        self.resubscribe();
        EventIndex::new(kind, index)
    }

    /// Drop the handlers picked by `selector`, then resubscribe.
    pub fn unregister(&self, selector: impl Into<RemovalSelector<E::Kind>>) {
        let selector = selector.into();
        {
            let mut slots = self.slots();
            match &selector {
                RemovalSelector::All => slots.clear(),
                RemovalSelector::ByType(kind) => {
                    slots.insert(*kind, Vec::new());
                }
                RemovalSelector::ByHandle(handle) => clear_slot(&mut slots, handle),
                RemovalSelector::ByHandles(handles) => {
                    for handle in handles {
                        clear_slot(&mut slots, handle);
                    }
                }
            }
        }
        debug!(selector = ?selector, "Handlers unregistered");
        self.resubscribe();
    }

    /// Deliver `event` to every active handler of its kind, in slot order.
    ///
    /// Each handler gets its own clone of `event`. Slots appended while the
    /// event is being delivered are not visited; slots cleared before they are
    /// reached are skipped.
    pub fn dispatch(&self, event: &E) -> Dispatch {
        let kind = event.kind();
        let mut report = Dispatch::default();
        let Some(len) = self.slots().get(&kind).map(Vec::len) else {
            return report;
        };

        for index in 0..len {
            let handler = self
                .slots()
                .get(&kind)
                .and_then(|list| list.get(index))
                .and_then(|slot| slot.clone());
            let Some(handler) = handler else { continue };
            report.record(handler::invoke(
                &handler,
                event.clone(),
                EventIndex::new(kind, index),
                self.inner.options,
            ));
        }
        report
    }

    /// Kinds with at least one active (non-tombstone) handler.
    pub fn registered_types(&self) -> BTreeSet<E::Kind> {
        self.slots()
            .iter()
            .filter(|(_, list)| list.iter().any(Option::is_some))
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Whether `handle` currently addresses an active handler in this plugin.
    pub fn is_active(&self, handle: &EventIndex<E::Kind>) -> bool {
        self.slots()
            .get(&handle.kind())
            .and_then(|list| list.get(handle.index()))
            .is_some_and(Option::is_some)
    }

    fn slots(&self) -> MutexGuard<'_, SlotTable<E>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn resubscribe(&self) {
        if let Some(manager) = self.manager() {
            manager.update();
        }
    }
}

fn clear_slot<E: Event>(slots: &mut SlotTable<E>, handle: &EventIndex<E::Kind>) {
    if let Some(slot) = slots
        .get_mut(&handle.kind())
        .and_then(|list| list.get_mut(handle.index()))
    {
        *slot = None;
    }
}

/// Frees a one-shot handler's slot when dropped, at most once across every
/// invocation of that handler.
struct Release<E: Event> {
    plugin: Weak<PluginInner<E>>,
    slot: Arc<OnceLock<EventIndex<E::Kind>>>,
    released: Arc<AtomicBool>,
}

impl<E: Event> Drop for Release<E> {
    fn drop(&mut self) {
        // Not yet known only if the handler fired before registration returned.
        let Some(handle) = self.slot.get().copied() else {
            return;
        };
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.plugin.upgrade() {
            Plugin { inner }.unregister(handle);
        }
    }
}
