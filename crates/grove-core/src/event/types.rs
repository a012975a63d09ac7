use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::config::ConfigTree;

/// Loosely typed event payload
pub type EventMap = BTreeMap<String, Value>;

/// Kind of notification delivered to plugins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEventKind {
    /// A watched class or file changed
    Change,
    /// Application configuration was reloaded
    ConfigChange,
    /// The plugin manager is shutting down
    Shutdown,
    /// Event raised by a plugin for its observers
    Custom(String),
}

impl PluginEventKind {
    pub fn name(&self) -> &str {
        match self {
            PluginEventKind::Change => "plugin.change",
            PluginEventKind::ConfigChange => "plugin.config_change",
            PluginEventKind::Shutdown => "plugin.shutdown",
            PluginEventKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for PluginEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What triggered an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventSource {
    Class(String),
    File(PathBuf),
    Config(ConfigTree),
    None,
}

/// Notification delivered through `Plugin::notify_of_event`.
///
/// `subject` is the plugin the event concerns; observers receive events
/// whose subject is a plugin they observe.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEvent {
    pub kind: PluginEventKind,
    pub subject: String,
    pub source: EventSource,
    pub data: EventMap,
}

impl PluginEvent {
    pub fn new(kind: PluginEventKind, subject: &str, source: EventSource) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            source,
            data: EventMap::new(),
        }
    }

    pub fn class_changed(subject: &str, class_id: &str) -> Self {
        Self::new(PluginEventKind::Change, subject, EventSource::Class(class_id.to_string()))
    }

    pub fn file_changed(subject: &str, path: PathBuf) -> Self {
        Self::new(PluginEventKind::Change, subject, EventSource::File(path))
    }

    pub fn config_changed(subject: &str, config: ConfigTree) -> Self {
        Self::new(PluginEventKind::ConfigChange, subject, EventSource::Config(config))
    }

    pub fn shutdown(subject: &str) -> Self {
        Self::new(PluginEventKind::Shutdown, subject, EventSource::None)
    }

    pub fn custom(subject: &str, name: &str) -> Self {
        Self::new(PluginEventKind::Custom(name.to_string()), subject, EventSource::None)
    }

    pub fn with_data<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}
