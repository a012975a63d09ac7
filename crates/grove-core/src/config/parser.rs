use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::error::ConfigError;
use crate::config::tree::ConfigTree;
use crate::kernel::bootstrap::{AppMetadata, Environment};
use crate::kernel::constants::ENVIRONMENTS_KEY;

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Parse `data` into a JSON-shaped value
    pub fn parse(self, data: &str) -> Result<Value, ConfigError> {
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| ConfigError::parse("JSON", e)),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| ConfigError::parse("YAML", e)),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| ConfigError::parse("TOML", e)),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Named values substituted for `${name}` placeholders in string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBindings {
    vars: BTreeMap<String, String>,
}

impl ConfigBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `userHome`, `appName` and `appVersion`, plus `frameworkVersion` when known
    pub fn standard(metadata: &AppMetadata) -> Self {
        let mut bindings = Self::new()
            .with("appName", &metadata.name)
            .with("appVersion", &metadata.version);
        if let Ok(home) = std::env::var("HOME") {
            bindings = bindings.with("userHome", &home);
        }
        if let Some(framework) = &metadata.framework_version {
            bindings = bindings.with("frameworkVersion", framework);
        }
        bindings
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Replace every known `${name}` in `input`; unknown placeholders stay as written
    pub fn substitute(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.get(name) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 3 + end]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn apply(&self, value: &mut Value) {
        match value {
            Value::String(s) if s.contains("${") => *s = self.substitute(s),
            Value::Array(items) => items.iter_mut().for_each(|v| self.apply(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.apply(v)),
            _ => {}
        }
    }
}

/// Turns a configuration file into a [`ConfigTree`] for an environment.
pub trait ConfigParser: Send + Sync + fmt::Debug {
    fn parse(&self, path: &Path, environment: &Environment, bindings: &ConfigBindings) -> Result<ConfigTree, ConfigError>;
}

/// File-based parser selecting the format from the file extension.
///
/// A top-level `environments` table is removed from the result and the
/// table named after the current environment is merged over the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigParser;

impl FileConfigParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(
        &self,
        data: &str,
        format: ConfigFormat,
        environment: &Environment,
        bindings: &ConfigBindings,
    ) -> Result<ConfigTree, ConfigError> {
        let mut value = format.parse(data)?;
        bindings.apply(&mut value);

        let mut tree = ConfigTree::from_value(value)
            .ok_or_else(|| ConfigError::parse(&format.to_string(), "top level is not a table"))?;

        if let Some(environments) = tree.remove(ENVIRONMENTS_KEY) {
            if let Some(block) = environments
                .get(environment.name())
                .cloned()
                .and_then(ConfigTree::from_value)
            {
                log::debug!("Applying configuration block for environment '{}'", environment);
                tree.merge(&block);
            }
        }
        Ok(tree)
    }
}

impl ConfigParser for FileConfigParser {
    fn parse(&self, path: &Path, environment: &Environment, bindings: &ConfigBindings) -> Result<ConfigTree, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&data, format, environment, bindings)
            .map_err(|e| e.with_path(path))
    }
}
