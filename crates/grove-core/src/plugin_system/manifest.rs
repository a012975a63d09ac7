use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ConfigFormat;
use crate::kernel::constants::MANIFEST_MARKER;
use crate::plugin_system::classes::BASIC_PLUGIN_CLASS;
use crate::plugin_system::dependency::PluginDependency;
use crate::plugin_system::descriptor::{PluginDescriptor, WatchPattern};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::version::VersionRequirement;
use crate::utils::naming::normalize_plugin_name;

// --- Intermediate structs for deserialization ---

#[derive(Deserialize, Debug)]
struct RawWatchPattern {
    directory: PathBuf,
    extension: String,
}

#[derive(Deserialize, Debug)]
struct RawPluginManifest {
    name: String,
    version: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    framework_version: Option<String>,
    /// Dependency name to version requirement
    #[serde(default)]
    depends_on: BTreeMap<String, String>,
    #[serde(default)]
    load_after: Vec<String>,
    #[serde(default)]
    load_before: Vec<String>,
    #[serde(default)]
    evicts: Vec<String>,
    #[serde(default)]
    observes: Vec<String>,
    #[serde(default)]
    watched_resources: Vec<RawWatchPattern>,
    #[serde(default)]
    provides: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    environments: Vec<String>,
    #[serde(default)]
    profiles: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// A user plugin described by a manifest file
#[derive(Debug, Clone)]
pub struct PluginManifest {
    /// Plugin class to instantiate
    pub class_id: String,
    pub descriptor: PluginDescriptor,
    pub path: PathBuf,
}

impl PluginManifest {
    /// Whether `path` names a manifest file (`<name>.plugin.<ext>` in a
    /// supported format)
    pub fn is_manifest_path(path: &Path) -> bool {
        let is_marked = path
            .file_name()
            .map(|n| n.to_string_lossy().contains(MANIFEST_MARKER))
            .unwrap_or(false);
        is_marked && ConfigFormat::from_path(path).is_some()
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self, PluginSystemError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| PluginSystemError::Manifest {
            path: path.to_path_buf(),
            message: "unsupported manifest format".to_string(),
            source: None,
        })?;
        let content = fs::read_to_string(path).map_err(|e| PluginSystemError::Manifest {
            path: path.to_path_buf(),
            message: "failed to read manifest".to_string(),
            source: Some(Box::new(e)),
        })?;
        Self::parse(&content, format, path)
    }

    /// Parse manifest text. Relative watch directories resolve against the
    /// manifest's own directory.
    pub fn parse(content: &str, format: ConfigFormat, path: &Path) -> Result<Self, PluginSystemError> {
        let manifest_error = |message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>| {
            PluginSystemError::Manifest {
                path: path.to_path_buf(),
                message,
                source,
            }
        };

        let value = format
            .parse(content)
            .map_err(|e| manifest_error(format!("failed to parse {} manifest", format), Some(Box::new(e))))?;
        let raw: RawPluginManifest = serde_json::from_value(value)
            .map_err(|e| manifest_error("invalid manifest".to_string(), Some(Box::new(e))))?;

        if raw.name.trim().is_empty() {
            return Err(manifest_error("plugin name is empty".to_string(), None));
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut descriptor = PluginDescriptor::new(&raw.name, &raw.version);
        descriptor.framework_version = raw.framework_version;
        descriptor.enabled = raw.enabled;
        descriptor.environments = raw.environments;
        descriptor.profiles = raw.profiles;
        descriptor.provided_artefacts = raw.provides;

        for (name, range) in raw.depends_on {
            let version_range = VersionRequirement::parse(&range).map_err(|e| {
                manifest_error(
                    format!("invalid version requirement '{}' for dependency '{}'", range, name),
                    Some(Box::new(e)),
                )
            })?;
            descriptor.dependencies.push(PluginDependency::new(&name, version_range));
        }

        let normalize = |names: Vec<String>| names.iter().map(|n| normalize_plugin_name(n)).collect::<Vec<_>>();
        descriptor.load_after = normalize(raw.load_after);
        descriptor.load_before = normalize(raw.load_before);
        descriptor.evicts = normalize(raw.evicts);
        descriptor.observes = normalize(raw.observes);
        descriptor.watched_resources = raw
            .watched_resources
            .into_iter()
            .map(|w| {
                let directory = if w.directory.is_relative() {
                    base_dir.join(&w.directory)
                } else {
                    w.directory
                };
                WatchPattern::new(directory, &w.extension)
            })
            .collect();

        Ok(Self {
            class_id: raw.class.unwrap_or_else(|| BASIC_PLUGIN_CLASS.to_string()),
            descriptor,
            path: path.to_path_buf(),
        })
    }
}
