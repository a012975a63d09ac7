use std::collections::BTreeMap;

use crate::utils::naming::simple_class_name;

/// Recognises a family of artefact classes by their simple-name suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactHandler {
    pub type_name: String,
    pub suffix: String,
    /// Plugin that registered the handler, if it came from a plugin
    pub plugin_name: Option<String>,
}

impl ArtefactHandler {
    pub fn new(type_name: &str, suffix: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            suffix: suffix.to_string(),
            plugin_name: None,
        }
    }

    /// Whether `class_id` belongs to this handler's artefact type
    pub fn matches(&self, class_id: &str) -> bool {
        let simple = simple_class_name(class_id);
        !self.suffix.is_empty() && simple.ends_with(&self.suffix) && simple != self.suffix
    }
}

/// A class registered as an artefact of the running application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactRecord {
    pub class_id: String,
    pub artefact_type: Option<String>,
    pub plugin_name: Option<String>,
    /// Provided by a plugin and replaceable by the application
    pub overridable: bool,
}

/// Artefact handlers and the artefact classes registered against them.
#[derive(Debug, Default)]
pub struct ArtefactRegistry {
    handlers: Vec<ArtefactHandler>,
    artefacts: BTreeMap<String, ArtefactRecord>,
    current_plugin: Option<String>,
}

impl ArtefactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers registered while a plugin is configuring
    /// artefacts are attributed to that plugin.
    pub fn register_handler(&mut self, type_name: &str, suffix: &str) {
        let mut handler = ArtefactHandler::new(type_name, suffix);
        handler.plugin_name = self.current_plugin.clone();
        log::debug!(
            "Registered artefact handler '{}' (suffix '{}') for plugin {:?}",
            type_name,
            suffix,
            handler.plugin_name
        );
        self.handlers.push(handler);
    }

    /// First handler, in registration order, recognising `class_id`
    pub fn handler_for(&self, class_id: &str) -> Option<&ArtefactHandler> {
        self.handlers.iter().find(|h| h.matches(class_id))
    }

    pub fn handlers(&self) -> &[ArtefactHandler] {
        &self.handlers
    }

    /// Register an application artefact.
    pub fn add_artefact(&mut self, class_id: &str, plugin_name: Option<&str>) {
        self.insert(class_id, plugin_name, false);
    }

    /// Register an artefact the application may replace with its own class.
    pub fn add_overridable_artefact(&mut self, class_id: &str, plugin_name: Option<&str>) {
        self.insert(class_id, plugin_name, true);
    }

    fn insert(&mut self, class_id: &str, plugin_name: Option<&str>, overridable: bool) {
        let artefact_type = self.handler_for(class_id).map(|h| h.type_name.clone());
        self.artefacts.insert(
            class_id.to_string(),
            ArtefactRecord {
                class_id: class_id.to_string(),
                artefact_type,
                plugin_name: plugin_name.map(str::to_string),
                overridable,
            },
        );
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.artefacts.contains_key(class_id)
    }

    pub fn get(&self, class_id: &str) -> Option<&ArtefactRecord> {
        self.artefacts.get(class_id)
    }

    /// Name of the plugin owning `class_id`, through its handler first and
    /// then through the artefact record itself
    pub fn plugin_name_for(&self, class_id: &str) -> Option<&str> {
        self.handler_for(class_id)
            .and_then(|h| h.plugin_name.as_deref())
            .or_else(|| self.get(class_id).and_then(|r| r.plugin_name.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.artefacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artefacts.is_empty()
    }

    pub(crate) fn set_current_plugin(&mut self, plugin_name: Option<&str>) {
        self.current_plugin = plugin_name.map(str::to_string);
    }
}
