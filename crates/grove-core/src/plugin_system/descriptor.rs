use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::bootstrap::Environment;
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::version::VersionRequirement;
use crate::utils::fs::has_extension;
use crate::utils::naming::normalize_plugin_name;

/// Where a plugin was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginOrigin {
    /// Bundled with the framework; always ordered before user plugins
    Core,
    #[default]
    User,
}

impl fmt::Display for PluginOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginOrigin::Core => write!(f, "core"),
            PluginOrigin::User => write!(f, "user"),
        }
    }
}

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginState {
    #[default]
    Unregistered,
    Registered,
    Initialized,
    Shutdown,
}

/// A directory plus file extension a plugin watches for changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchPattern {
    pub directory: PathBuf,
    pub extension: String,
}

impl WatchPattern {
    pub fn new<P: Into<PathBuf>>(directory: P, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Whether `path` lies below the directory and has the extension
    pub fn matches(&self, path: &Path) -> bool {
        path.starts_with(&self.directory) && has_extension(path, &self.extension)
    }

    /// Candidate source file for a class path (`com/acme/Book`) under this pattern
    pub fn candidate(&self, class_path: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", class_path, self.extension))
    }
}

/// Declarative metadata of one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Normalized (camelCase) plugin name
    pub name: String,
    pub version: String,
    /// Framework versions the plugin declares support for
    pub framework_version: Option<String>,
    pub dependencies: Vec<PluginDependency>,
    pub load_after: Vec<String>,
    pub load_before: Vec<String>,
    pub evicts: Vec<String>,
    /// Observed plugin names; `*` observes every plugin
    pub observes: Vec<String>,
    pub watched_resources: Vec<WatchPattern>,
    pub provided_artefacts: Vec<String>,
    pub enabled: bool,
    /// Supported environments; empty means all
    pub environments: Vec<String>,
    /// Profiles the plugin is enabled for; empty means all
    pub profiles: Vec<String>,
}

impl PluginDescriptor {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: normalize_plugin_name(name),
            version: version.trim().to_string(),
            framework_version: None,
            dependencies: Vec::new(),
            load_after: Vec::new(),
            load_before: Vec::new(),
            evicts: Vec::new(),
            observes: Vec::new(),
            watched_resources: Vec::new(),
            provided_artefacts: Vec::new(),
            enabled: true,
            environments: Vec::new(),
            profiles: Vec::new(),
        }
    }

    // Builder helpers

    pub fn depends_on(mut self, name: &str, version_range: VersionRequirement) -> Self {
        self.dependencies.push(PluginDependency::new(name, version_range));
        self
    }

    pub fn depends_on_any(self, name: &str) -> Self {
        self.depends_on(name, VersionRequirement::Any)
    }

    pub fn load_after(mut self, name: &str) -> Self {
        self.load_after.push(normalize_plugin_name(name));
        self
    }

    pub fn load_before(mut self, name: &str) -> Self {
        self.load_before.push(normalize_plugin_name(name));
        self
    }

    pub fn evicts(mut self, name: &str) -> Self {
        self.evicts.push(normalize_plugin_name(name));
        self
    }

    pub fn observes(mut self, name: &str) -> Self {
        self.observes.push(normalize_plugin_name(name));
        self
    }

    pub fn watching(mut self, pattern: WatchPattern) -> Self {
        self.watched_resources.push(pattern);
        self
    }

    pub fn provides(mut self, class_id: &str) -> Self {
        self.provided_artefacts.push(class_id.to_string());
        self
    }

    pub fn framework_version(mut self, range: &str) -> Self {
        self.framework_version = Some(range.to_string());
        self
    }

    pub fn environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = environments.into_iter().map(Into::into).collect();
        self
    }

    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    // Queries

    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.plugin_name.as_str()).collect()
    }

    /// Version requirement declared for dependency `name`
    pub fn dependent_version(&self, name: &str) -> Option<&VersionRequirement> {
        self.dependencies
            .iter()
            .find(|d| d.plugin_name == name)
            .map(|d| &d.version_range)
    }

    pub fn supports_environment(&self, environment: &Environment) -> bool {
        self.environments.is_empty()
            || self
                .environments
                .iter()
                .any(|e| e.eq_ignore_ascii_case(environment.name()))
    }

    /// Enabled and, when both sides name profiles, sharing at least one
    pub fn is_enabled_for(&self, active_profiles: &[String]) -> bool {
        if !self.enabled {
            return false;
        }
        self.profiles.is_empty()
            || active_profiles.is_empty()
            || self.profiles.iter().any(|p| active_profiles.contains(p))
    }

    pub fn has_interest_in_change(&self, path: &Path) -> bool {
        self.watched_resources.iter().any(|w| w.matches(path))
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] with version [{}]", self.name, self.version)
    }
}
