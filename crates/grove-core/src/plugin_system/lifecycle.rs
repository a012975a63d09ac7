use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::event::{EventMap, PluginEvent};
use crate::kernel::bootstrap::Application;
use crate::kernel::context::{ApplicationContext, RuntimeConfiguration};
use crate::plugin_system::dispatch::DispatchRegistry;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::registry::{PluginEntry, PluginRegistry};
use crate::plugin_system::traits::{PluginError, PluginResult};

/// Ordered phases driven over the registered plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    ArtefactConfiguration,
    RuntimeConfiguration,
    DynamicMethods,
    PostProcessing,
    Startup,
    Shutdown,
}

impl LifecyclePhase {
    pub const ALL: [LifecyclePhase; 6] = [
        LifecyclePhase::ArtefactConfiguration,
        LifecyclePhase::RuntimeConfiguration,
        LifecyclePhase::DynamicMethods,
        LifecyclePhase::PostProcessing,
        LifecyclePhase::Startup,
        LifecyclePhase::Shutdown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LifecyclePhase::ArtefactConfiguration => "artefact-configuration",
            LifecyclePhase::RuntimeConfiguration => "runtime-configuration",
            LifecyclePhase::DynamicMethods => "dynamic-methods",
            LifecyclePhase::PostProcessing => "post-processing",
            LifecyclePhase::Startup => "startup",
            LifecyclePhase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a phase does when a plugin hook fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhasePolicy {
    /// Abort the remaining plugins and return the error
    FailFast,
    /// Log the failure and continue with the next plugin
    BestEffort,
}

/// Failure policy per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PhasePolicies {
    pub artefact_configuration: PhasePolicy,
    pub runtime_configuration: PhasePolicy,
    pub dynamic_methods: PhasePolicy,
    pub post_processing: PhasePolicy,
    pub startup: PhasePolicy,
    pub shutdown: PhasePolicy,
}

impl Default for PhasePolicies {
    fn default() -> Self {
        Self {
            artefact_configuration: PhasePolicy::FailFast,
            runtime_configuration: PhasePolicy::FailFast,
            dynamic_methods: PhasePolicy::FailFast,
            post_processing: PhasePolicy::BestEffort,
            startup: PhasePolicy::FailFast,
            shutdown: PhasePolicy::BestEffort,
        }
    }
}

impl PhasePolicies {
    pub fn policy_for(&self, phase: LifecyclePhase) -> PhasePolicy {
        match phase {
            LifecyclePhase::ArtefactConfiguration => self.artefact_configuration,
            LifecyclePhase::RuntimeConfiguration => self.runtime_configuration,
            LifecyclePhase::DynamicMethods => self.dynamic_methods,
            LifecyclePhase::PostProcessing => self.post_processing,
            LifecyclePhase::Startup => self.startup,
            LifecyclePhase::Shutdown => self.shutdown,
        }
    }

    pub fn with(mut self, phase: LifecyclePhase, policy: PhasePolicy) -> Self {
        let slot = match phase {
            LifecyclePhase::ArtefactConfiguration => &mut self.artefact_configuration,
            LifecyclePhase::RuntimeConfiguration => &mut self.runtime_configuration,
            LifecyclePhase::DynamicMethods => &mut self.dynamic_methods,
            LifecyclePhase::PostProcessing => &mut self.post_processing,
            LifecyclePhase::Startup => &mut self.startup,
            LifecyclePhase::Shutdown => &mut self.shutdown,
        };
        *slot = policy;
        self
    }
}

/// Result of running one phase
#[derive(Debug)]
pub struct PhaseReport {
    pub phase: LifecyclePhase,
    /// Plugins whose hook ran, in execution order
    pub visited: Vec<String>,
    /// Plugins filtered out by profile or environment
    pub skipped: Vec<String>,
    /// Hook failures tolerated under a best-effort policy
    pub failures: Vec<(String, PluginError)>,
}

impl PhaseReport {
    pub fn new(phase: LifecyclePhase) -> Self {
        Self {
            phase,
            visited: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives lifecycle phases over the registry in load order.
#[derive(Debug, Clone, Default)]
pub struct LifecycleCoordinator {
    policies: PhasePolicies,
}

impl LifecycleCoordinator {
    pub fn new(policies: PhasePolicies) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PhasePolicies {
        &self.policies
    }

    /// Run `hook` for each plugin passing `is_active`, applying the phase policy
    pub fn run_phase<'a, I, A, F>(
        &self,
        phase: LifecyclePhase,
        plugins: I,
        is_active: A,
        mut hook: F,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        I: IntoIterator<Item = &'a PluginEntry>,
        A: Fn(&PluginEntry) -> bool,
        F: FnMut(&'a PluginEntry) -> PluginResult<()>,
    {
        let mut report = PhaseReport::new(phase);
        for entry in plugins {
            if !is_active(entry) {
                report.skipped.push(entry.name().to_string());
                continue;
            }
            report.visited.push(entry.name().to_string());
            if let Err(e) = hook(entry) {
                self.handle_failure(phase, entry.name(), e, &mut report)?;
            }
        }
        log::debug!(
            "Phase {} ran for {} plugin(s), skipped {}, {} failure(s)",
            phase,
            report.visited.len(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn handle_failure(
        &self,
        phase: LifecyclePhase,
        plugin_id: &str,
        error: PluginError,
        report: &mut PhaseReport,
    ) -> Result<(), PluginSystemError> {
        match self.policies.policy_for(phase) {
            PhasePolicy::FailFast => Err(PluginSystemError::PhaseExecution {
                phase,
                plugin_id: plugin_id.to_string(),
                source: error,
            }),
            PhasePolicy::BestEffort => {
                log::error!("Plugin [{}] failed during {}: {}", plugin_id, phase, error);
                report.failures.push((plugin_id.to_string(), error));
                Ok(())
            }
        }
    }

    /// Each plugin registers artefact handlers and artefacts
    pub fn artefact_configuration<A>(
        &self,
        registry: &PluginRegistry,
        application: &mut Application,
        is_active: A,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        let result = self.run_phase(LifecyclePhase::ArtefactConfiguration, registry.iter(), is_active, |entry| {
            let artefacts = application.artefacts_mut();
            artefacts.set_current_plugin(Some(entry.name()));
            entry.instance().do_artefact_configuration(artefacts)
        });
        application.artefacts_mut().set_current_plugin(None);
        result
    }

    /// Runtime configuration of every plugin in load order
    pub fn runtime_configuration_all<A>(
        &self,
        registry: &PluginRegistry,
        config: &mut RuntimeConfiguration,
        application: &Application,
        is_active: A,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        self.run_phase(LifecyclePhase::RuntimeConfiguration, registry.iter(), is_active, |entry| {
            entry.instance().do_with_runtime_configuration(config, application)
        })
    }

    /// Runtime configuration of `name`, its dependencies first (recursively),
    /// then its load-after plugins. A dependency that is not registered is a
    /// hard failure. Each plugin is configured at most once.
    pub fn runtime_configuration_for<A>(
        &self,
        registry: &PluginRegistry,
        name: &str,
        config: &mut RuntimeConfiguration,
        application: &Application,
        is_active: A,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        let entry = registry
            .get(name)
            .ok_or_else(|| PluginSystemError::PluginNotFound(name.to_string()))?;
        let mut report = PhaseReport::new(LifecyclePhase::RuntimeConfiguration);
        let mut seen = HashSet::new();
        self.configure_recursive(registry, entry, config, application, &is_active, &mut seen, &mut report)?;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn configure_recursive<'a, A>(
        &self,
        registry: &'a PluginRegistry,
        entry: &'a PluginEntry,
        config: &mut RuntimeConfiguration,
        application: &Application,
        is_active: &A,
        seen: &mut HashSet<&'a str>,
        report: &mut PhaseReport,
    ) -> Result<(), PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        if !seen.insert(entry.name()) {
            return Ok(());
        }
        if !is_active(entry) {
            report.skipped.push(entry.name().to_string());
            return Ok(());
        }

        for dependency in entry.descriptor().dependency_names() {
            let dep = registry.get(dependency).ok_or_else(|| PluginSystemError::DependencyNotFound {
                plugin_id: entry.name().to_string(),
                dependency: dependency.to_string(),
            })?;
            self.configure_recursive(registry, dep, config, application, is_active, seen, report)?;
        }

        for after in &entry.descriptor().load_after {
            if let Some(other) = registry.get(after) {
                self.configure_recursive(registry, other, config, application, is_active, seen, report)?;
            }
        }

        report.visited.push(entry.name().to_string());
        if let Err(e) = entry.instance().do_with_runtime_configuration(config, application) {
            self.handle_failure(LifecyclePhase::RuntimeConfiguration, entry.name(), e, report)?;
        }
        Ok(())
    }

    /// Clear cached dispatch entries for common value types, then let each
    /// plugin install its behaviour
    pub fn dynamic_methods<A>(
        &self,
        registry: &PluginRegistry,
        context: &ApplicationContext,
        dispatch: &mut DispatchRegistry,
        is_active: A,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        let cleared = dispatch.clear_common_types();
        log::debug!("Cleared cached dispatch entries for {} common type(s)", cleared);

        let result = self.run_phase(LifecyclePhase::DynamicMethods, registry.iter(), is_active, |entry| {
            dispatch.set_current_plugin(Some(entry.name()));
            entry.instance().do_with_dynamic_methods(context, dispatch)
        });
        dispatch.set_current_plugin(None);
        result
    }

    pub fn post_processing<A>(
        &self,
        registry: &PluginRegistry,
        context: &ApplicationContext,
        is_active: A,
    ) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        self.run_phase(LifecyclePhase::PostProcessing, registry.iter(), is_active, |entry| {
            entry.instance().do_with_application_context(context)
        })
    }

    /// Deliver `event` to every plugin exposing a startup hook, in load order
    pub fn startup(&self, registry: &PluginRegistry, event: &EventMap) -> Result<PhaseReport, PluginSystemError> {
        self.run_phase(
            LifecyclePhase::Startup,
            registry.iter(),
            |entry| entry.instance().startup_hook().is_some(),
            |entry| match entry.instance().startup_hook() {
                Some(hook) => hook.on_startup(event),
                None => Ok(()),
            },
        )
    }

    /// Deliver a shutdown event in reverse load order
    pub fn shutdown<A>(&self, registry: &PluginRegistry, is_active: A) -> Result<PhaseReport, PluginSystemError>
    where
        A: Fn(&PluginEntry) -> bool,
    {
        self.run_phase(LifecyclePhase::Shutdown, registry.iter().rev(), is_active, |entry| {
            entry.instance().notify_of_event(&PluginEvent::shutdown(entry.name()))
        })
    }
}
