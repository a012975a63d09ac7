use std::collections::{BTreeMap, VecDeque};

use crate::kernel::bootstrap::Application;
use crate::plugin_system::descriptor::PluginState;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::eviction::EvictionManager;
use crate::plugin_system::observer::ObserverRegistry;
use crate::plugin_system::registry::{PluginEntry, PluginRegistry};

/// A plugin that could never be registered
#[derive(Debug)]
pub struct FailedPlugin {
    pub entry: PluginEntry,
    pub error: PluginSystemError,
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// Disabled, unsupported in the environment or a duplicate name
    Skipped,
}

/// Mutable state touched while plugins are registered
pub struct LoadPass<'a> {
    pub registry: &'a mut PluginRegistry,
    pub observers: &'a mut ObserverRegistry,
    pub evictions: &'a mut EvictionManager,
    pub failed: &'a mut BTreeMap<String, FailedPlugin>,
    pub application: &'a Application,
}

impl LoadPass<'_> {
    /// Register `entry` unless it is disabled or unsupported in the
    /// current environment
    pub fn register(&mut self, mut entry: PluginEntry) -> Registration {
        let environment = self.application.environment();
        if !entry.descriptor().enabled || !entry.supports_environment(environment) {
            log::info!(
                "Plugin {} is disabled or does not support environment '{}' and was not loaded",
                entry.descriptor(),
                environment
            );
            return Registration::Skipped;
        }

        let name = entry.name().to_string();
        entry.set_application(self.application);
        entry.set_state(PluginState::Registered);
        let evicts = entry.descriptor().evicts.clone();
        let observes = entry.descriptor().observes.clone();
        let label = entry.descriptor().to_string();

        if let Err(e) = self.registry.register(entry) {
            log::warn!("{}", e);
            return Registration::Skipped;
        }
        self.evictions.record(&name, &evicts);
        self.observers.add(&name, &observes);
        log::info!("Plugin {} loaded successfully", label);
        Registration::Registered
    }

    /// Every hard dependency is registered at a satisfying version
    pub fn dependencies_resolved(&self, entry: &PluginEntry) -> bool {
        entry
            .descriptor()
            .dependencies
            .iter()
            .all(|d| self.registry.get_versioned(&d.plugin_name, &d.version_range).is_some())
    }

    /// Every plugin named in load-after is registered
    pub fn load_after_satisfied(&self, entry: &PluginEntry) -> bool {
        entry
            .descriptor()
            .load_after
            .iter()
            .all(|name| self.registry.has(name))
    }

    /// Dependency names not yet registered at a satisfying version
    pub fn unresolved_dependencies(&self, entry: &PluginEntry) -> Vec<String> {
        entry
            .descriptor()
            .dependencies
            .iter()
            .filter(|d| self.registry.get_versioned(&d.plugin_name, &d.version_range).is_none())
            .map(|d| d.plugin_name.clone())
            .collect()
    }

    pub fn fail(&mut self, entry: PluginEntry, missing: Vec<String>) {
        let error = PluginSystemError::UnresolvedDependency {
            plugin_id: entry.name().to_string(),
            missing,
        };
        log::error!("{}", error);
        self.failed.insert(entry.name().to_string(), FailedPlugin { entry, error });
    }
}

/// Two-pass registration with a bounded retry queue.
///
/// Pass 1 registers every candidate whose dependencies and load-after
/// plugins are already registered and queues the rest. Pass 2 retries the
/// queue until it drains. A round over the queue that neither registers nor
/// fails a plugin is idle; after `max_idle_rounds` idle rounds the remaining
/// plugins fail.
#[derive(Debug)]
pub struct DelayedLoadScheduler {
    queue: VecDeque<PluginEntry>,
    max_idle_rounds: usize,
}

impl DelayedLoadScheduler {
    pub fn new(max_idle_rounds: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_idle_rounds: max_idle_rounds.max(1),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Pass 1 over candidates already ordered core-first
    pub fn attempt_load<I>(&mut self, candidates: I, pass: &mut LoadPass<'_>)
    where
        I: IntoIterator<Item = PluginEntry>,
    {
        for entry in candidates {
            if pass.dependencies_resolved(&entry) && pass.load_after_satisfied(&entry) {
                pass.register(entry);
            } else {
                log::debug!("Delaying load of plugin {}", entry.descriptor());
                self.queue.push_back(entry);
            }
        }
    }

    /// Pass 2: drain the queue
    pub fn load_delayed(&mut self, pass: &mut LoadPass<'_>) {
        let mut idle_rounds = 0;

        while !self.queue.is_empty() {
            let round = self.queue.len();
            let mut progressed = false;

            for _ in 0..round {
                let Some(entry) = self.queue.pop_front() else {
                    break;
                };

                if pass.dependencies_resolved(&entry) {
                    if self.has_valid_plugins_to_load_before(&entry, pass) {
                        self.queue.push_back(entry);
                    } else {
                        pass.register(entry);
                        progressed = true;
                    }
                } else if self.queue.iter().any(|other| entry.is_dependent_on(other)) {
                    self.queue.push_back(entry);
                } else {
                    let missing = pass.unresolved_dependencies(&entry);
                    pass.fail(entry, missing);
                    progressed = true;
                }
            }

            if progressed {
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
                if idle_rounds >= self.max_idle_rounds {
                    self.fail_remaining(pass);
                }
            }
        }
    }

    /// A queued plugin named in load-after that can still be registered
    fn has_valid_plugins_to_load_before(&self, entry: &PluginEntry, pass: &LoadPass<'_>) -> bool {
        let load_after = &entry.descriptor().load_after;
        self.queue
            .iter()
            .find(|queued| load_after.iter().any(|n| n == queued.name()))
            .is_some_and(|queued| self.has_delayed_dependencies(queued) || pass.dependencies_resolved(queued))
    }

    /// Whether `entry` depends on another queued plugin
    fn has_delayed_dependencies(&self, entry: &PluginEntry) -> bool {
        entry
            .descriptor()
            .dependencies
            .iter()
            .any(|d| self.queue.iter().any(|q| q.name() == d.plugin_name))
    }

    fn fail_remaining(&mut self, pass: &mut LoadPass<'_>) {
        log::warn!(
            "Delayed plugin loading made no progress; {} plugin(s) cannot be loaded",
            self.queue.len()
        );
        while let Some(entry) = self.queue.pop_front() {
            let mut missing = pass.unresolved_dependencies(&entry);
            if missing.is_empty() {
                missing = entry
                    .descriptor()
                    .load_after
                    .iter()
                    .filter(|n| !pass.registry.has(n))
                    .cloned()
                    .collect();
            }
            pass.fail(entry, missing);
        }
    }
}
