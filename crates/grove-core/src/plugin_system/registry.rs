use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::bootstrap::{Application, Environment};
use crate::kernel::context::ApplicationContext;
use crate::plugin_system::classes::BASIC_PLUGIN_CLASS;
use crate::plugin_system::descriptor::{PluginDescriptor, PluginOrigin, PluginState};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::VersionRequirement;
use crate::utils::naming::normalize_plugin_name;

/// A discovered plugin: descriptor, resolved class and live instance
pub struct PluginEntry {
    descriptor: PluginDescriptor,
    class_id: String,
    source: Option<PathBuf>,
    origin: PluginOrigin,
    instance: Box<dyn Plugin>,
    state: PluginState,
    context: Option<Arc<ApplicationContext>>,
}

impl PluginEntry {
    pub fn new(descriptor: PluginDescriptor, class_id: &str, origin: PluginOrigin, instance: Box<dyn Plugin>) -> Self {
        Self {
            descriptor,
            class_id: class_id.to_string(),
            source: None,
            origin,
            instance,
            state: PluginState::Unregistered,
            context: None,
        }
    }

    /// Record the artifact the plugin was discovered from
    pub fn with_source<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn origin(&self) -> PluginOrigin {
        self.origin
    }

    pub fn is_core(&self) -> bool {
        self.origin == PluginOrigin::Core
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn instance(&self) -> &dyn Plugin {
        self.instance.as_ref()
    }

    pub fn application_context(&self) -> Option<&Arc<ApplicationContext>> {
        self.context.as_ref()
    }

    pub fn is_enabled_for(&self, active_profiles: &[String]) -> bool {
        self.descriptor.is_enabled_for(active_profiles)
    }

    pub fn supports_environment(&self, environment: &Environment) -> bool {
        self.descriptor.supports_environment(environment)
    }

    pub fn has_interest_in_change(&self, path: &Path) -> bool {
        self.descriptor.has_interest_in_change(path)
    }

    /// Whether this plugin declares a dependency `other` satisfies
    pub fn is_dependent_on(&self, other: &PluginEntry) -> bool {
        self.descriptor
            .dependencies
            .iter()
            .any(|d| d.is_satisfied_by(other.name(), other.version()))
    }

    pub(crate) fn set_state(&mut self, state: PluginState) {
        self.state = state;
    }

    pub(crate) fn set_application(&mut self, application: &Application) {
        self.instance.set_application(application);
    }

    pub(crate) fn set_application_context(&mut self, context: &Arc<ApplicationContext>) {
        self.context = Some(Arc::clone(context));
        self.instance.set_application_context(context);
    }
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.descriptor.name)
            .field("version", &self.descriptor.version)
            .field("class_id", &self.class_id)
            .field("origin", &self.origin)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Registered plugins in load order, with a name index and a
/// class-identifier index
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginEntry>,
    load_order: Vec<String>,
    class_index: HashMap<String, String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin to the load order. Names are unique.
    pub fn register(&mut self, entry: PluginEntry) -> Result<(), PluginSystemError> {
        let name = entry.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(PluginSystemError::Registration {
                plugin_id: name,
                message: "a plugin with this name is already registered".to_string(),
            });
        }
        // Manifest-only plugins share the basic class; it names no single owner
        if entry.class_id != BASIC_PLUGIN_CLASS {
            self.class_index.insert(entry.class_id.clone(), name.clone());
        }
        self.load_order.push(name.clone());
        self.plugins.insert(name, entry);
        Ok(())
    }

    /// Remove a plugin from the load order and every index
    pub fn remove(&mut self, name: &str) -> Option<PluginEntry> {
        let name = normalize_plugin_name(name);
        let entry = self.plugins.remove(&name)?;
        self.load_order.retain(|n| *n != name);
        self.class_index.retain(|_, owner| *owner != name);
        Some(entry)
    }

    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.get(&normalize_plugin_name(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginEntry> {
        self.plugins.get_mut(&normalize_plugin_name(name))
    }

    /// Plugin `name` if its version satisfies `required`
    pub fn get_versioned(&self, name: &str, required: &VersionRequirement) -> Option<&PluginEntry> {
        self.get(name).filter(|e| required.is_satisfied_by(e.version()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.plugins.contains_key(&normalize_plugin_name(name))
    }

    /// Associate a class identifier with its owning plugin
    pub fn index_class(&mut self, class_id: &str, plugin_name: &str) {
        self.class_index.insert(class_id.to_string(), plugin_name.to_string());
    }

    pub fn plugin_for_class(&self, class_id: &str) -> Option<&PluginEntry> {
        self.class_index.get(class_id).and_then(|name| self.plugins.get(name))
    }

    /// Plugins in load order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PluginEntry> + '_ {
        self.load_order.iter().filter_map(|name| self.plugins.get(name))
    }

    pub fn names(&self) -> &[String] {
        &self.load_order
    }

    /// Apply `f` to every plugin in load order
    pub fn for_each_mut<F: FnMut(&mut PluginEntry)>(&mut self, mut f: F) {
        for name in &self.load_order {
            if let Some(entry) = self.plugins.get_mut(name) {
                f(entry);
            }
        }
    }

    /// Replace the load order with a permutation of the registered names
    pub fn reorder(&mut self, order: Vec<String>) -> Result<(), PluginSystemError> {
        let is_permutation = order.len() == self.load_order.len()
            && order.iter().all(|name| self.plugins.contains_key(name));
        if !is_permutation {
            return Err(PluginSystemError::Internal(
                "resolved order does not match the registered plugins".to_string(),
            ));
        }
        self.load_order = order;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
        self.load_order.clear();
        self.class_index.clear();
    }
}
