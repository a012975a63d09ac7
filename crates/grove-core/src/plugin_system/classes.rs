use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Plugin;

/// Class identifier of the behaviour-less plugin used by manifest-only plugins
pub const BASIC_PLUGIN_CLASS: &str = "grove.BasicPlugin";

/// Creates a fresh plugin instance
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// A resolved plugin class: an identifier, an optional built-in descriptor
/// and a factory for instances
#[derive(Clone)]
pub struct PluginClass {
    class_id: String,
    descriptor: Option<PluginDescriptor>,
    factory: PluginFactory,
}

impl PluginClass {
    pub fn new<F>(class_id: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            class_id: class_id.to_string(),
            descriptor: None,
            factory: Arc::new(factory),
        }
    }

    /// Attach the metadata the class declares for itself
    pub fn with_descriptor(mut self, descriptor: PluginDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn descriptor(&self) -> Option<&PluginDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.factory)()
    }
}

impl fmt::Debug for PluginClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginClass")
            .field("class_id", &self.class_id)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Turns class identifiers into loadable plugin classes.
pub trait ClassResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, class_id: &str) -> Result<PluginClass, PluginSystemError>;

    fn has_class(&self, class_id: &str) -> bool {
        self.resolve(class_id).is_ok()
    }
}

/// Resolver backed by a table of statically registered classes.
#[derive(Debug, Clone)]
pub struct StaticClassResolver {
    classes: BTreeMap<String, PluginClass>,
}

impl StaticClassResolver {
    /// Resolver knowing only [`BASIC_PLUGIN_CLASS`]
    pub fn new() -> Self {
        Self::empty().with_class(PluginClass::new(BASIC_PLUGIN_CLASS, || Box::new(BasicPlugin)))
    }

    pub fn empty() -> Self {
        Self {
            classes: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, class: PluginClass) {
        if self.classes.insert(class.class_id.clone(), class).is_some() {
            log::debug!("Replaced previously registered plugin class");
        }
    }

    pub fn with_class(mut self, class: PluginClass) -> Self {
        self.register(class);
        self
    }

    pub fn class_ids(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }
}

impl Default for StaticClassResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassResolver for StaticClassResolver {
    fn resolve(&self, class_id: &str) -> Result<PluginClass, PluginSystemError> {
        self.classes
            .get(class_id)
            .cloned()
            .ok_or_else(|| PluginSystemError::ClassNotFound {
                class_id: class_id.to_string(),
            })
    }

    fn has_class(&self, class_id: &str) -> bool {
        self.classes.contains_key(class_id)
    }
}

/// Plugin without behaviour; its descriptor carries everything
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPlugin;

impl Plugin for BasicPlugin {}
