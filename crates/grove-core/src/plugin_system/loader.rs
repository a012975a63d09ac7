use std::path::{Path, PathBuf};

use crate::kernel::constants::PLUGIN_CLASS_SUFFIX;
use crate::plugin_system::classes::ClassResolver;
use crate::plugin_system::compat::CompatibilityChecker;
use crate::plugin_system::descriptor::PluginOrigin;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manifest::PluginManifest;
use crate::plugin_system::registry::PluginEntry;
use crate::utils::fs::find_files;
use crate::utils::naming::simple_class_name;

/// Candidates produced by discovery, in discovery order
#[derive(Debug, Default)]
pub struct DiscoveredPlugins {
    pub core: Vec<PluginEntry>,
    pub user: Vec<PluginEntry>,
}

impl DiscoveredPlugins {
    pub fn len(&self) -> usize {
        self.core.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.user.is_empty()
    }

    /// Core plugins strictly before user plugins
    pub fn into_ordered(self) -> Vec<PluginEntry> {
        let mut all = self.core;
        all.extend(self.user);
        all
    }
}

/// Finds candidate plugins: core classes supplied by the host, user
/// manifests found on disk and explicitly supplied user classes.
#[derive(Debug, Clone, Default)]
pub struct PluginLoader {
    core_classes: Vec<String>,
    user_classes: Vec<String>,
    manifest_sources: Vec<PathBuf>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_class(mut self, class_id: &str) -> Self {
        self.core_classes.push(class_id.to_string());
        self
    }

    pub fn with_user_class(mut self, class_id: &str) -> Self {
        self.user_classes.push(class_id.to_string());
        self
    }

    /// A manifest file or a directory scanned recursively for manifests
    pub fn with_manifest_source<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.manifest_sources.push(source.into());
        self
    }

    pub fn manifest_sources(&self) -> &[PathBuf] {
        &self.manifest_sources
    }

    /// Resolve every candidate. Unresolvable classes and unreadable
    /// manifests abort discovery.
    pub fn discover(
        &self,
        resolver: &dyn ClassResolver,
        checker: &CompatibilityChecker,
        load_core: bool,
    ) -> Result<DiscoveredPlugins, PluginSystemError> {
        let mut discovered = DiscoveredPlugins::default();

        if load_core {
            for class_id in &self.core_classes {
                discovered.core.push(self.load_class(resolver, checker, class_id, PluginOrigin::Core)?);
            }
        }
        log::info!("Attempting to load [{}] core plugins", discovered.core.len());

        for path in self.manifest_paths()? {
            let manifest = PluginManifest::load(&path)?;
            if !has_plugin_suffix(&manifest.class_id) {
                log::warn!(
                    "Plugin class [{}] declared in {} does not end with '{}' and was skipped",
                    manifest.class_id,
                    path.display(),
                    PLUGIN_CLASS_SUFFIX
                );
                continue;
            }
            let class = resolver.resolve(&manifest.class_id).map_err(|e| discovery_error(&path, e))?;
            checker.check(&manifest.descriptor);
            let entry = PluginEntry::new(manifest.descriptor, class.class_id(), PluginOrigin::User, class.instantiate())
                .with_source(path);
            discovered.user.push(entry);
        }

        for class_id in &self.user_classes {
            if !has_plugin_suffix(class_id) {
                log::warn!(
                    "Plugin class [{}] does not end with '{}' and was skipped",
                    class_id,
                    PLUGIN_CLASS_SUFFIX
                );
                continue;
            }
            discovered.user.push(self.load_class(resolver, checker, class_id, PluginOrigin::User)?);
        }
        log::info!("Attempting to load [{}] user defined plugins", discovered.user.len());

        Ok(discovered)
    }

    fn load_class(
        &self,
        resolver: &dyn ClassResolver,
        checker: &CompatibilityChecker,
        class_id: &str,
        origin: PluginOrigin,
    ) -> Result<PluginEntry, PluginSystemError> {
        let class = resolver.resolve(class_id)?;
        let descriptor = class
            .descriptor()
            .cloned()
            .ok_or_else(|| PluginSystemError::discovery(class_id, "plugin class declares no descriptor"))?;
        checker.check(&descriptor);
        Ok(PluginEntry::new(descriptor, class_id, origin, class.instantiate()))
    }

    fn manifest_paths(&self) -> Result<Vec<PathBuf>, PluginSystemError> {
        let mut paths = Vec::new();
        for source in &self.manifest_sources {
            let found = find_files(source, &|p: &Path| PluginManifest::is_manifest_path(p)).map_err(|e| {
                PluginSystemError::Discovery {
                    source_name: source.display().to_string(),
                    message: "failed to scan for plugin manifests".to_string(),
                    source: Some(Box::new(e)),
                }
            })?;
            for path in found {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }
}

fn has_plugin_suffix(class_id: &str) -> bool {
    simple_class_name(class_id).ends_with(PLUGIN_CLASS_SUFFIX)
}

fn discovery_error(path: &Path, error: PluginSystemError) -> PluginSystemError {
    PluginSystemError::Discovery {
        source_name: path.display().to_string(),
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}
