//! # Grove Core Plugin System Errors
//!
//! Defines error types specific to the Grove plugin system.
//!
//! [`PluginSystemError`] covers discovery, manifest parsing, dependency
//! resolution, lifecycle phase execution and configuration reload failures.
//! Errors raised by plugin hooks themselves are [`PluginError`]s and are
//! wrapped into [`PluginSystemError::PhaseExecution`] by the lifecycle
//! coordinator.
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::lifecycle::LifecyclePhase;
use crate::plugin_system::traits::PluginError;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin discovery failed for '{source_name}': {message}")]
    Discovery {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin class '{class_id}' could not be resolved")]
    ClassNotFound { class_id: String },

    #[error("Plugin manifest error for '{}': {message}", path.display())]
    Manifest {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin registration error for '{plugin_id}': {message}")]
    Registration { plugin_id: String, message: String },

    #[error("Plugin [{plugin_id}] cannot be loaded because its dependencies {} cannot be resolved", format_names(missing))]
    UnresolvedDependency { plugin_id: String, missing: Vec<String> },

    #[error("Plugin '{plugin_id}' depends on '{dependency}' which is not registered")]
    DependencyNotFound { plugin_id: String, dependency: String },

    #[error("Plugin '{0}' not found")]
    PluginNotFound(String),

    #[error("Plugin '{plugin_id}' failed during {phase}: {source}")]
    PhaseExecution {
        phase: LifecyclePhase,
        plugin_id: String,
        #[source]
        source: PluginError,
    },

    #[error("Configuration reload failed for '{}': {source}", path.display())]
    ConfigReload {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("Plugin manager has not been initialised; call load_plugins first")]
    NotInitialised,

    #[error("No application context has been set on the plugin manager")]
    ContextNotSet,

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),

    #[error("Internal plugin system error: {0}")]
    Internal(String),
}

fn format_names(names: &[String]) -> String {
    format!("[{}]", names.join(", "))
}

impl PluginSystemError {
    pub fn discovery(source_name: &str, message: impl ToString) -> Self {
        PluginSystemError::Discovery {
            source_name: source_name.to_string(),
            message: message.to_string(),
            source: None,
        }
    }

    /// Name of the plugin the error concerns, when there is one
    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            PluginSystemError::Registration { plugin_id, .. }
            | PluginSystemError::UnresolvedDependency { plugin_id, .. }
            | PluginSystemError::DependencyNotFound { plugin_id, .. }
            | PluginSystemError::PhaseExecution { plugin_id, .. } => Some(plugin_id),
            PluginSystemError::PluginNotFound(name) => Some(name),
            _ => None,
        }
    }
}
