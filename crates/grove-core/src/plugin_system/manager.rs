use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use crate::config::{ConfigBindings, ConfigError, ConfigFormat, ConfigParser, ConfigTree, FileConfigParser};
use crate::event::{EventMap, PluginEvent};
use crate::kernel::bootstrap::Application;
use crate::kernel::constants::{
    APP_DIR, CONFIG_FILE_STEM, CONFIG_ROOT_KEY, DEFAULT_MAX_IDLE_ROUNDS, PLUGINS_PATH, VIEWS_DIR,
};
use crate::kernel::context::{ApplicationContext, RuntimeConfiguration};
use crate::kernel::error::Result;
use crate::plugin_system::compat::CompatibilityChecker;
use crate::plugin_system::dependency::{CyclePolicy, DependencyResolver};
use crate::plugin_system::descriptor::{PluginDescriptor, PluginState};
use crate::plugin_system::dispatch::DispatchRegistry;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::eviction::EvictionManager;
use crate::plugin_system::filter::PluginFilter;
use crate::plugin_system::lifecycle::{LifecycleCoordinator, LifecyclePhase, PhasePolicies, PhaseReport};
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::observer::ObserverRegistry;
use crate::plugin_system::registry::{PluginEntry, PluginRegistry};
use crate::plugin_system::scheduler::{DelayedLoadScheduler, FailedPlugin, LoadPass};
use crate::plugin_system::version::is_valid_version;
use crate::utils::naming::{
    class_name_for_path, class_path_for_name, has_package, hyphenate_plugin_name, normalize_plugin_name,
    simple_class_name,
};

/// `grove.plugins.*` settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub load_core: bool,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub max_idle_rounds: usize,
    pub cycle_policy: CyclePolicy,
    /// Extra directories scanned for plugin manifests
    pub directories: Vec<PathBuf>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            load_core: true,
            includes: Vec::new(),
            excludes: Vec::new(),
            max_idle_rounds: DEFAULT_MAX_IDLE_ROUNDS,
            cycle_policy: CyclePolicy::default(),
            directories: Vec::new(),
        }
    }
}

/// Plugin manager settings, read from the `grove` configuration subtree
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub plugins: PluginSettings,
    pub lifecycle: PhasePolicies,
}

impl ManagerSettings {
    pub fn from_config(config: &ConfigTree) -> std::result::Result<Self, ConfigError> {
        config
            .subtree(CONFIG_ROOT_KEY)
            .deserialize_into()
            .map_err(|e| match e {
                ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
                    key: CONFIG_ROOT_KEY.to_string(),
                    message,
                },
                other => other,
            })
    }
}

/// The most recent failure to apply a reloaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadError {
    pub path: PathBuf,
    /// Plugin that failed to apply the change, if the failure was not a parse error
    pub plugin: Option<String>,
    pub message: String,
}

/// Owns the plugin registry and drives discovery, registration and the
/// lifecycle phases.
#[derive(Debug)]
pub struct PluginManager {
    application: Application,
    context: Option<Arc<ApplicationContext>>,
    loader: PluginLoader,
    settings: ManagerSettings,
    filter: PluginFilter,
    registry: PluginRegistry,
    failed: BTreeMap<String, FailedPlugin>,
    observers: ObserverRegistry,
    evictions: EvictionManager,
    dispatch: DispatchRegistry,
    lifecycle: LifecycleCoordinator,
    config_parser: Box<dyn ConfigParser>,
    reload_error: Option<ReloadError>,
    initialised: bool,
    shutdown: bool,
}

impl PluginManager {
    /// Create a manager reading its settings from the application configuration
    pub fn new(application: Application, loader: PluginLoader) -> Result<Self> {
        let settings = ManagerSettings::from_config(application.config())?;
        Ok(Self::with_settings(application, loader, settings))
    }

    pub fn with_settings(application: Application, loader: PluginLoader, settings: ManagerSettings) -> Self {
        let filter = PluginFilter::from_settings(&settings.plugins.includes, &settings.plugins.excludes);
        Self {
            application,
            context: None,
            loader,
            filter,
            registry: PluginRegistry::new(),
            failed: BTreeMap::new(),
            observers: ObserverRegistry::new(),
            evictions: EvictionManager::new(),
            dispatch: DispatchRegistry::new(),
            lifecycle: LifecycleCoordinator::new(settings.lifecycle),
            settings,
            config_parser: Box::new(FileConfigParser::new()),
            reload_error: None,
            initialised: false,
            shutdown: false,
        }
    }

    pub fn with_config_parser(mut self, parser: Box<dyn ConfigParser>) -> Self {
        self.config_parser = parser;
        self
    }

    pub fn set_plugin_filter(&mut self, filter: PluginFilter) {
        self.filter = filter;
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    // --- Loading ---

    /// Discover, register, order and initialise plugins.
    ///
    /// Runs once; later calls return immediately. Discovery failures and
    /// rejected cycles abort the load and leave the manager uninitialised.
    pub fn load_plugins(&mut self) -> Result<()> {
        if self.initialised {
            log::debug!("Plugins already loaded, ignoring load request");
            return Ok(());
        }
        let started = Instant::now();
        self.reset_load_state();

        let mut loader = self.loader.clone();
        for directory in &self.settings.plugins.directories {
            loader = loader.with_manifest_source(directory.clone());
        }
        let checker = CompatibilityChecker::new(self.application.metadata().framework_version.clone());
        let discovered = loader.discover(
            self.application.class_resolver().as_ref(),
            &checker,
            self.settings.plugins.load_core,
        )?;

        let filtered = self.filter.filter_plugin_list(discovered.into_ordered());
        let (core, user): (Vec<_>, Vec<_>) = filtered.into_iter().partition(PluginEntry::is_core);

        let mut scheduler = DelayedLoadScheduler::new(self.settings.plugins.max_idle_rounds);
        {
            let mut pass = LoadPass {
                registry: &mut self.registry,
                observers: &mut self.observers,
                evictions: &mut self.evictions,
                failed: &mut self.failed,
                application: &self.application,
            };
            scheduler.attempt_load(core.into_iter().chain(user), &mut pass);
            scheduler.load_delayed(&mut pass);
        }

        self.evictions.apply(&mut self.registry);

        // Core and user plugins are ordered separately; core always comes first
        let resolver = DependencyResolver::new(self.settings.plugins.cycle_policy);
        let mut order = Vec::with_capacity(self.registry.len());
        for core in [true, false] {
            let partition: Vec<&PluginDescriptor> = self
                .registry
                .iter()
                .filter(|entry| entry.is_core() == core)
                .map(PluginEntry::descriptor)
                .collect();
            let resolved = resolver.resolve(&partition).map_err(PluginSystemError::from)?;
            order.extend(resolved.order);
        }
        self.registry.reorder(order)?;

        self.initialize_plugins();
        self.initialised = true;

        log::info!(
            "Total {} plugins loaded successfully, took {}ms",
            self.registry.len(),
            started.elapsed().as_millis()
        );
        Ok(())
    }

    fn reset_load_state(&mut self) {
        self.registry.clear();
        self.failed.clear();
        self.observers.clear();
        self.evictions.clear();
    }

    fn initialize_plugins(&mut self) {
        let context = self.context.clone();
        self.registry.for_each_mut(|entry| {
            if let Some(ctx) = &context {
                entry.set_application_context(ctx);
            }
            entry.set_state(PluginState::Initialized);
        });
    }

    fn check_initialised(&self) -> std::result::Result<(), PluginSystemError> {
        if self.initialised {
            Ok(())
        } else {
            Err(PluginSystemError::NotInitialised)
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    // --- Queries ---

    /// Registered plugin by name; hyphenated names are normalized
    pub fn get_plugin(&self, name: &str) -> Option<&PluginEntry> {
        self.registry.get(name)
    }

    /// Registered plugin by name whose version satisfies `version`
    pub fn get_plugin_version(&self, name: &str, version: &str) -> Option<&PluginEntry> {
        self.registry
            .get(name)
            .filter(|entry| is_valid_version(entry.version(), version))
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    /// Plugin owning `class_id`, via the class table and then the artefact registry
    pub fn get_plugin_for_class(&self, class_id: &str) -> Option<&PluginEntry> {
        self.registry.plugin_for_class(class_id).or_else(|| {
            self.application
                .artefacts()
                .plugin_name_for(class_id)
                .and_then(|name| self.registry.get(name))
        })
    }

    // --- Plugin paths ---

    /// Resource path of a registered plugin: `/plugins/<hyphen-name>-<version>`,
    /// or `/plugins/<camelName>-<version>` when `force_camel_case` is set
    pub fn plugin_path(&self, name: &str, force_camel_case: bool) -> Option<String> {
        let entry = self.registry.get(name)?;
        let name = if force_camel_case {
            entry.name().to_string()
        } else {
            hyphenate_plugin_name(entry.name())
        };
        Some(format!("{}/{}-{}", PLUGINS_PATH, name, entry.version()))
    }

    /// Resource path of the plugin owning `class_id`
    pub fn plugin_path_for_class(&self, class_id: &str) -> Option<String> {
        let name = self.get_plugin_for_class(class_id)?.name().to_string();
        self.plugin_path(&name, false)
    }

    /// Views directory of the plugin owning `class_id`
    pub fn plugin_views_path_for_class(&self, class_id: &str) -> Option<String> {
        self.plugin_path_for_class(class_id)
            .map(|path| format!("{}/{}/{}", path, APP_DIR, VIEWS_DIR))
    }

    /// Registered plugins in load order
    pub fn get_all_plugins(&self) -> Vec<&PluginEntry> {
        self.registry.iter().collect()
    }

    /// Registered plugins discovered from user sources
    pub fn get_user_plugins(&self) -> Vec<&PluginEntry> {
        self.registry.iter().filter(|e| !e.is_core()).collect()
    }

    pub fn get_failed_plugins(&self) -> Vec<&FailedPlugin> {
        self.failed.values().collect()
    }

    pub fn get_failed_plugin(&self, name: &str) -> Option<&FailedPlugin> {
        self.failed.get(&normalize_plugin_name(name))
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn evictions(&self) -> &EvictionManager {
        &self.evictions
    }

    pub fn dispatch(&self) -> &DispatchRegistry {
        &self.dispatch
    }

    pub fn current_reload_error(&self) -> Option<&ReloadError> {
        self.reload_error.as_ref()
    }

    // --- References ---

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.application
    }

    /// Replace the application and push it to every registered plugin
    pub fn set_application(&mut self, application: Application) {
        self.application = application;
        let application = &self.application;
        self.registry.for_each_mut(|entry| entry.set_application(application));
    }

    pub fn application_context(&self) -> Option<&Arc<ApplicationContext>> {
        self.context.as_ref()
    }

    /// Store the context and push it to every registered plugin
    pub fn set_application_context(&mut self, context: Arc<ApplicationContext>) {
        self.registry.for_each_mut(|entry| entry.set_application_context(&context));
        self.context = Some(context);
    }

    fn active_profiles(&self) -> Vec<String> {
        self.context
            .as_ref()
            .map(|ctx| ctx.active_profiles().to_vec())
            .unwrap_or_default()
    }

    /// Enabled for the active profiles and supporting the current environment
    fn activity_filter(&self) -> impl Fn(&PluginEntry) -> bool + use<> {
        let profiles = self.active_profiles();
        let environment = self.application.environment().clone();
        move |entry| entry.is_enabled_for(&profiles) && entry.supports_environment(&environment)
    }

    fn require_context(&self) -> std::result::Result<Arc<ApplicationContext>, PluginSystemError> {
        self.context.clone().ok_or(PluginSystemError::ContextNotSet)
    }

    // --- Lifecycle phases ---

    pub fn do_artefact_configuration(&mut self) -> Result<PhaseReport> {
        self.check_initialised()?;
        let is_active = self.activity_filter();
        Ok(self
            .lifecycle
            .artefact_configuration(&self.registry, &mut self.application, is_active)?)
    }

    /// Register every plugin's provided artefacts as overridable artefacts.
    ///
    /// Plugins are walked in reverse load order and artefacts already known
    /// by full or simple name are left alone. Returns how many were added.
    pub fn register_provided_artefacts(&mut self) -> Result<usize> {
        self.check_initialised()?;
        let is_active = self.activity_filter();

        let mut provided: Vec<(String, String)> = Vec::new();
        for entry in self.registry.iter().rev().filter(|entry| is_active(*entry)) {
            for class_id in &entry.descriptor().provided_artefacts {
                provided.push((class_id.clone(), entry.name().to_string()));
            }
        }

        let mut added = 0;
        for (class_id, plugin_name) in provided {
            if !has_package(&class_id) {
                log::warn!(
                    "Class [{}] provided by plugin [{}] is defined in the default package which is not supported",
                    class_id,
                    plugin_name
                );
            }
            let artefacts = self.application.artefacts_mut();
            if artefacts.contains(&class_id) || artefacts.contains(simple_class_name(&class_id)) {
                continue;
            }
            artefacts.add_overridable_artefact(&class_id, Some(&plugin_name));
            self.registry.index_class(&class_id, &plugin_name);
            added += 1;
        }
        Ok(added)
    }

    /// Runtime configuration for `name` and, first, everything it depends on
    pub fn do_runtime_configuration(&self, name: &str, config: &mut RuntimeConfiguration) -> Result<PhaseReport> {
        self.check_initialised()?;
        Ok(self.lifecycle.runtime_configuration_for(
            &self.registry,
            name,
            config,
            &self.application,
            self.activity_filter(),
        )?)
    }

    /// Runtime configuration for every plugin in load order
    pub fn do_runtime_configuration_all(&self, config: &mut RuntimeConfiguration) -> Result<PhaseReport> {
        self.check_initialised()?;
        Ok(self
            .lifecycle
            .runtime_configuration_all(&self.registry, config, &self.application, self.activity_filter())?)
    }

    pub fn do_dynamic_methods(&mut self) -> Result<PhaseReport> {
        self.check_initialised()?;
        let context = self.require_context()?;
        let is_active = self.activity_filter();
        Ok(self
            .lifecycle
            .dynamic_methods(&self.registry, &context, &mut self.dispatch, is_active)?)
    }

    pub fn do_post_processing(&mut self, context: &Arc<ApplicationContext>) -> Result<PhaseReport> {
        self.check_initialised()?;
        Ok(self
            .lifecycle
            .post_processing(&self.registry, context, self.activity_filter())?)
    }

    pub fn on_startup(&self, event: &EventMap) -> Result<PhaseReport> {
        self.check_initialised()?;
        Ok(self.lifecycle.startup(&self.registry, event)?)
    }

    /// Notify plugins in reverse load order, then mark the manager shut down
    pub fn shutdown(&mut self) -> Result<PhaseReport> {
        self.check_initialised()?;
        let report = self.lifecycle.shutdown(&self.registry, self.activity_filter())?;
        self.registry.for_each_mut(|entry| entry.set_state(PluginState::Shutdown));
        self.shutdown = true;
        log::info!("Plugin manager shut down ({} plugins)", report.visited.len());
        Ok(report)
    }

    // --- Observers and change notification ---

    /// Registered observers of `name`, wildcard observers included
    pub fn plugin_observers(&self, name: &str) -> Vec<&PluginEntry> {
        self.observers
            .observers_of(name)
            .iter()
            .filter_map(|observer| self.registry.get(observer))
            .collect()
    }

    /// Deliver `event` to the observers of `name` enabled for the active
    /// profiles. Returns how many observers received it.
    pub fn inform_observers(&self, name: &str, event: &PluginEvent) -> usize {
        let profiles = self.active_profiles();
        match self.registry.get(name) {
            Some(subject) if subject.is_enabled_for(&profiles) => {}
            _ => return 0,
        }

        let mut delivered = 0;
        for observer in self.plugin_observers(name) {
            if !observer.is_enabled_for(&profiles) {
                log::debug!("Observer [{}] is disabled; skipping {}", observer.name(), event.kind);
                continue;
            }
            match observer.instance().notify_of_event(event) {
                Ok(()) => delivered += 1,
                Err(e) => log::error!(
                    "Observer [{}] failed to handle {} for [{}]: {}",
                    observer.name(),
                    event.kind,
                    name,
                    e
                ),
            }
        }
        delivered
    }

    /// Deliver a change event to `name`, then to its observers
    fn notify_change(&self, name: &str, event: &PluginEvent) -> std::result::Result<(), PluginSystemError> {
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| PluginSystemError::PluginNotFound(name.to_string()))?;
        entry
            .instance()
            .notify_of_event(event)
            .map_err(|e| PluginSystemError::Internal(format!("[{}] could not apply change: {}", name, e)))?;
        self.inform_observers(name, event);
        Ok(())
    }

    /// Route a changed class to the plugin owning its artefact handler.
    /// When that plugin is not registered, plugins watching a matching
    /// source file are notified instead. Returns how many plugins were notified.
    pub fn inform_of_class_change(&self, class_id: &str) -> usize {
        if !self.initialised {
            return 0;
        }
        let plugin_name = match self
            .application
            .artefacts()
            .handler_for(class_id)
            .and_then(|h| h.plugin_name.clone())
        {
            Some(name) => name,
            None => return 0,
        };

        if let Some(entry) = self.registry.get(&plugin_name) {
            if !entry.is_enabled_for(&self.active_profiles()) {
                return 0;
            }
            let event = PluginEvent::class_changed(entry.name(), class_id);
            return match self.notify_change(&plugin_name, &event) {
                Ok(()) => 1,
                Err(e) => {
                    log::error!("{}", e);
                    0
                }
            };
        }

        let class_path = class_path_for_name(class_id);
        let watchers: Vec<String> = self
            .registry
            .iter()
            .filter(|entry| {
                entry
                    .descriptor()
                    .watched_resources
                    .iter()
                    .any(|pattern| pattern.candidate(&class_path).exists())
            })
            .map(|entry| entry.name().to_string())
            .collect();

        let mut notified = 0;
        for name in watchers {
            let event = PluginEvent::class_changed(&name, class_id);
            match self.notify_change(&name, &event) {
                Ok(()) => notified += 1,
                Err(e) => log::error!("{}", e),
            }
        }
        notified
    }

    /// Handle a changed file. The application configuration file is
    /// re-parsed and merged; any other file goes to the plugins watching it.
    /// Returns how many plugins were notified.
    pub fn inform_of_file_change(&mut self, path: &Path) -> usize {
        if !self.initialised {
            return 0;
        }
        if is_config_file(path) {
            return self.reload_config(path);
        }

        let class_id = class_name_for_path(path).filter(|c| self.application.is_known_class(c));
        if let Some(class_id) = &class_id {
            self.dispatch.remove_type(simple_class_name(class_id));
        }

        let interested: Vec<String> = self
            .registry
            .iter()
            .filter(|entry| entry.has_interest_in_change(path))
            .map(|entry| entry.name().to_string())
            .collect();

        let mut notified = 0;
        for name in interested {
            let event = match &class_id {
                Some(class_id) => PluginEvent::class_changed(&name, class_id),
                None => PluginEvent::file_changed(&name, path.to_path_buf()),
            };
            match self.notify_change(&name, &event) {
                Ok(()) => {
                    self.reload_error = None;
                    notified += 1;
                }
                Err(e) => {
                    log::error!("Plugin [{}] could not reload changes to file [{}]: {}", name, path.display(), e);
                    self.reload_error = Some(ReloadError {
                        path: path.to_path_buf(),
                        plugin: Some(name),
                        message: e.to_string(),
                    });
                }
            }
        }
        notified
    }

    /// Re-parse and merge the configuration file. A parse failure keeps the
    /// current configuration and is recorded as the current reload error.
    fn reload_config(&mut self, path: &Path) -> usize {
        let bindings = ConfigBindings::standard(self.application.metadata());
        match self.config_parser.parse(path, self.application.environment(), &bindings) {
            Ok(tree) => {
                self.application.merge_config(&tree);
                self.application.config_changed();
                self.reload_error = None;
                self.inform_plugins_of_config_change()
            }
            Err(source) => {
                let error = PluginSystemError::ConfigReload {
                    path: path.to_path_buf(),
                    source,
                };
                log::error!("{}", error);
                self.reload_error = Some(ReloadError {
                    path: path.to_path_buf(),
                    plugin: None,
                    message: error.to_string(),
                });
                0
            }
        }
    }

    /// Send the current configuration to every registered plugin
    pub fn inform_plugins_of_config_change(&self) -> usize {
        if !self.initialised {
            return 0;
        }
        let mut informed = 0;
        for entry in self.registry.iter() {
            let event = PluginEvent::config_changed(entry.name(), self.application.config().clone());
            match entry.instance().notify_of_event(&event) {
                Ok(()) => informed += 1,
                Err(e) => log::error!("Plugin [{}] failed to apply configuration change: {}", entry.name(), e),
            }
        }
        informed
    }

    /// Ask a plugin to refresh itself. Returns false when it is not
    /// registered or plugins are not loaded yet.
    pub fn refresh_plugin(&self, name: &str) -> bool {
        if !self.initialised {
            return false;
        }
        match self.registry.get(name) {
            Some(entry) => {
                if let Err(e) = entry.instance().refresh() {
                    log::error!("Plugin [{}] failed to refresh: {}", entry.name(), e);
                }
                true
            }
            None => false,
        }
    }

    /// Re-run artefact configuration, runtime configuration, post-processing
    /// and dynamic-method installation for one plugin
    pub fn reload_plugin(&mut self, name: &str) -> Result<()> {
        self.check_initialised()?;
        let context = self.require_context()?;
        let is_active = self.activity_filter();
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| PluginSystemError::PluginNotFound(name.to_string()))?;
        let plugin_id = entry.name().to_string();
        let phase_error = |phase: LifecyclePhase, source| PluginSystemError::PhaseExecution {
            phase,
            plugin_id: plugin_id.clone(),
            source,
        };

        let artefacts = self.application.artefacts_mut();
        artefacts.set_current_plugin(Some(&plugin_id));
        let configured = entry.instance().do_artefact_configuration(artefacts);
        artefacts.set_current_plugin(None);
        configured.map_err(|e| phase_error(LifecyclePhase::ArtefactConfiguration, e))?;

        let mut config = RuntimeConfiguration::new();
        self.lifecycle
            .runtime_configuration_for(&self.registry, &plugin_id, &mut config, &self.application, is_active)?;
        let beans = config.register_beans_with(&context);
        log::debug!("Plugin [{}] re-registered {} bean(s)", plugin_id, beans);

        entry
            .instance()
            .do_with_application_context(&context)
            .map_err(|e| phase_error(LifecyclePhase::PostProcessing, e))?;

        self.dispatch.set_current_plugin(Some(&plugin_id));
        let installed = entry.instance().do_with_dynamic_methods(&context, &mut self.dispatch);
        self.dispatch.set_current_plugin(None);
        installed.map_err(|e| phase_error(LifecyclePhase::DynamicMethods, e))?;

        log::info!("Plugin [{}] reloaded", plugin_id);
        Ok(())
    }
}

fn is_config_file(path: &Path) -> bool {
    path.file_stem().is_some_and(|stem| stem == CONFIG_FILE_STEM) && ConfigFormat::from_path(path).is_some()
}
