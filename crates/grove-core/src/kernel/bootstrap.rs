use std::fmt;
use std::sync::Arc;

use crate::config::ConfigTree;
use crate::kernel::artefact::ArtefactRegistry;
use crate::kernel::constants;
use crate::plugin_system::classes::{ClassResolver, StaticClassResolver};

/// Descriptive metadata of the running application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    /// Framework version used for plugin compatibility checks. `None`
    /// disables the check.
    pub framework_version: Option<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: constants::APP_NAME.to_string(),
            version: constants::APP_VERSION.to_string(),
            framework_version: Some(constants::FRAMEWORK_VERSION.to_string()),
        }
    }
}

/// Named deployment environment (development, test, production, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Environment {
    name: String,
}

impl Environment {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
        }
    }

    /// Environment named by `GROVE_ENV`, or the default environment
    pub fn current() -> Self {
        match std::env::var(constants::ENV_VAR_ENVIRONMENT) {
            Ok(name) if !name.trim().is_empty() => Self::new(&name),
            _ => Self::new(constants::DEFAULT_ENVIRONMENT),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_development(&self) -> bool {
        self.name == constants::DEFAULT_ENVIRONMENT
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(constants::DEFAULT_ENVIRONMENT)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The application model plugins are loaded into.
pub struct Application {
    metadata: AppMetadata,
    environment: Environment,
    config: ConfigTree,
    artefacts: ArtefactRegistry,
    class_resolver: Arc<dyn ClassResolver>,
    config_generation: u64,
}

impl Application {
    pub fn new(metadata: AppMetadata, environment: Environment, class_resolver: Arc<dyn ClassResolver>) -> Self {
        log::info!(
            "Initializing {} v{} in environment '{}'",
            metadata.name,
            metadata.version,
            environment
        );
        Self {
            metadata,
            environment,
            config: ConfigTree::new(),
            artefacts: ArtefactRegistry::new(),
            class_resolver,
            config_generation: 0,
        }
    }

    /// Use `config` as the initial configuration
    pub fn with_config(mut self, config: ConfigTree) -> Self {
        self.config = config;
        self
    }

    pub fn metadata(&self) -> &AppMetadata {
        &self.metadata
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigTree {
        &mut self.config
    }

    /// Deep-merge `other` into the application configuration
    pub fn merge_config(&mut self, other: &ConfigTree) {
        self.config.merge(other);
    }

    /// Signal that the configuration changed after a merge.
    pub fn config_changed(&mut self) {
        self.config_generation += 1;
        log::debug!("Application configuration changed (generation {})", self.config_generation);
    }

    /// Number of configuration changes signalled so far
    pub fn config_generation(&self) -> u64 {
        self.config_generation
    }

    pub fn artefacts(&self) -> &ArtefactRegistry {
        &self.artefacts
    }

    pub fn artefacts_mut(&mut self) -> &mut ArtefactRegistry {
        &mut self.artefacts
    }

    pub fn class_resolver(&self) -> &Arc<dyn ClassResolver> {
        &self.class_resolver
    }

    /// Whether `class_id` names an artefact or a class the resolver knows
    pub fn is_known_class(&self, class_id: &str) -> bool {
        self.artefacts.contains(class_id) || self.class_resolver.has_class(class_id)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(
            AppMetadata::default(),
            Environment::default(),
            Arc::new(StaticClassResolver::new()),
        )
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("metadata", &self.metadata)
            .field("environment", &self.environment)
            .field("config_generation", &self.config_generation)
            .field("artefacts", &self.artefacts.len())
            .finish()
    }
}
