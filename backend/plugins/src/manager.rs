/// Plugin manager: owns the installed plugins and the subscription to the source.
///
/// Any change to the plugin set, or to any handler table, triggers a full
/// rebuild of the subscription: the union of every installed plugin's active
/// kinds is computed first, then the source is torn down and resubscribed to
/// exactly that union. Each subscription fans an incoming event out to every
/// installed plugin, which filters to its own matching slots.
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use switchboard_core::{DispatchOptions, Event, EventSource, Result, SwitchboardError};
use switchboard_logging::{EventLogger, RegistryEvent};
use tracing::{debug, info};

use crate::handler::Dispatch;
use crate::plugin::Plugin;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ManagerShared<E: Event> {
    id: u64,
    source: Arc<dyn EventSource<E>>,
    options: DispatchOptions,
    /// Insertion-ordered; replacing a name keeps its position.
    plugins: RwLock<Vec<(String, Plugin<E>)>>,
    /// Kinds currently subscribed. The lock also serializes rebuilds.
    subscriptions: Mutex<BTreeSet<E::Kind>>,
}

impl<E: Event> ManagerShared<E> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn options(&self) -> DispatchOptions {
        self.options
    }
}

impl<E: Event> Drop for ManagerShared<E> {
    fn drop(&mut self) {
        self.source.unsubscribe_all();
        debug!(manager = self.id, "Plugin manager dropped; source released");
    }
}

/// Cheap to clone; clones refer to the same manager.
pub struct PluginManager<E: Event> {
    shared: Arc<ManagerShared<E>>,
}

impl<E: Event> Clone for PluginManager<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Event> PluginManager<E> {
    pub fn new(source: Arc<dyn EventSource<E>>) -> Self {
        Self::with_options(source, DispatchOptions::default())
    }

    pub fn with_options(source: Arc<dyn EventSource<E>>, options: DispatchOptions) -> Self {
        let id = NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        info!(manager = id, fault_policy = %options.fault_policy, "Plugin manager created");
        Self {
            shared: Arc::new(ManagerShared {
                id,
                source,
                options,
                plugins: RwLock::new(Vec::new()),
                subscriptions: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<ManagerShared<E>>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<ManagerShared<E>> {
        &self.shared
    }

    pub fn source(&self) -> Arc<dyn EventSource<E>> {
        Arc::clone(&self.shared.source)
    }

    pub fn options(&self) -> DispatchOptions {
        self.shared.options
    }

    /// Install `plugin` under `name`, replacing any plugin already there.
    ///
    /// Always resubscribes. Fails with [`SwitchboardError::ForeignPlugin`] if
    /// `plugin` was created for another manager.
    pub fn install(&self, name: impl Into<String>, plugin: Plugin<E>) -> Result<()> {
        let name = name.into();
        if plugin.manager_id() != self.shared.id {
            return Err(SwitchboardError::ForeignPlugin { name });
        }

        let replaced = {
            let mut plugins = self.write_plugins();
            match plugins.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => {
                    let same = entry.1.same_as(&plugin);
                    entry.1 = plugin;
                    Some(same)
                }
                None => {
                    plugins.push((name.clone(), plugin));
                    None
                }
            }
        };

        match replaced {
            Some(true) => debug!(plugin = %name, "Plugin reinstalled unchanged"),
            Some(false) => EventLogger::log_event(RegistryEvent::PluginReplaced { name }),
            None => EventLogger::log_event(RegistryEvent::PluginInstalled { name }),
        }
        self.update();
        Ok(())
    }

    /// Remove the plugin called `name`. Returns whether it was installed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut plugins = self.write_plugins();
            let before = plugins.len();
            plugins.retain(|(n, _)| n != name);
            plugins.len() != before
        };
        if removed {
            EventLogger::log_event(RegistryEvent::PluginRemoved { name: name.to_string() });
            self.update();
        }
        removed
    }

    /// Remove every plugin; leaves the source with no subscriptions.
    pub fn remove_all(&self) {
        let count = {
            let mut plugins = self.write_plugins();
            let count = plugins.len();
            plugins.clear();
            count
        };
        EventLogger::log_event(RegistryEvent::PluginsCleared { count });
        self.update();
    }

    /// Rebuild the source subscription from the installed plugins.
    ///
    /// Mutating operations call this already; it is public for callers that
    /// change a source out from under the manager.
    pub fn update(&self) {
        let mut subscribed = self
            .shared
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let wanted: BTreeSet<E::Kind> = self
            .plugins()
            .iter()
            .flat_map(Plugin::registered_types)
            .collect();

        let source = &self.shared.source;
        source.unsubscribe_all();
        for kind in &wanted {
            let manager = Arc::downgrade(&self.shared);
            source.subscribe(
                *kind,
                Arc::new(move |event: E| {
                    if let Some(shared) = manager.upgrade() {
                        PluginManager::from_shared(shared).dispatch(&event);
                    }
                }),
            );
        }

        if *subscribed != wanted {
            EventLogger::log_event(RegistryEvent::Resubscribed {
                kinds: wanted.iter().map(|k| format!("{k:?}")).collect(),
            });
        }
        *subscribed = wanted;
    }

    /// Deliver `event` to every installed plugin, in installation order.
    ///
    /// Names are read once up front and each one is looked up again right
    /// before delivery, so a plugin removed by an earlier handler is skipped
    /// and a replaced one receives the event through its replacement. Plugins
    /// installed under new names wait for the next event.
    pub fn dispatch(&self, event: &E) -> Dispatch {
        let mut report = Dispatch::default();
        for name in self.names() {
            let Some(plugin) = self.get(&name) else {
                continue;
            };
            report.merge(plugin.dispatch(event));
        }
        report
    }

    pub fn get(&self, name: &str) -> Option<Plugin<E>> {
        self.read_plugins()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_plugins().iter().any(|(n, _)| n == name)
    }

    /// Installed plugin names, in installation order.
    pub fn names(&self) -> Vec<String> {
        self.read_plugins().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read_plugins().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_plugins().is_empty()
    }

    /// Kinds the source is currently subscribed to on this manager's behalf.
    pub fn subscriptions(&self) -> BTreeSet<E::Kind> {
        self.shared
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn plugins(&self) -> Vec<Plugin<E>> {
        self.read_plugins().iter().map(|(_, p)| p.clone()).collect()
    }

    fn read_plugins(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, Plugin<E>)>> {
        self.shared
            .plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_plugins(&self) -> std::sync::RwLockWriteGuard<'_, Vec<(String, Plugin<E>)>> {
        self.shared
            .plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
