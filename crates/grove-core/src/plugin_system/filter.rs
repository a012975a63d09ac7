use std::collections::HashSet;

use crate::plugin_system::registry::PluginEntry;
use crate::utils::naming::normalize_plugin_name;

/// Narrows the discovered plugin list before registration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PluginFilter {
    /// Keep everything
    #[default]
    Identity,
    /// Keep the named plugins and, transitively, their dependencies
    Including(Vec<String>),
    /// Drop the named plugins and, transitively, every plugin depending on them
    Excluding(Vec<String>),
}

impl PluginFilter {
    /// Includes win over excludes when both are configured
    pub fn from_settings(includes: &[String], excludes: &[String]) -> Self {
        if !includes.is_empty() {
            PluginFilter::Including(includes.iter().map(|n| normalize_plugin_name(n)).collect())
        } else if !excludes.is_empty() {
            PluginFilter::Excluding(excludes.iter().map(|n| normalize_plugin_name(n)).collect())
        } else {
            PluginFilter::Identity
        }
    }

    /// Apply the filter, keeping the relative order of the survivors
    pub fn filter_plugin_list(&self, plugins: Vec<PluginEntry>) -> Vec<PluginEntry> {
        let keep: HashSet<String> = match self {
            PluginFilter::Identity => return plugins,
            PluginFilter::Including(names) => Self::with_dependencies(&plugins, names),
            PluginFilter::Excluding(names) => {
                let excluded = Self::with_dependents(&plugins, names);
                plugins
                    .iter()
                    .map(|p| p.name().to_string())
                    .filter(|n| !excluded.contains(n))
                    .collect()
            }
        };

        let (kept, dropped): (Vec<_>, Vec<_>) = plugins.into_iter().partition(|p| keep.contains(p.name()));
        for plugin in &dropped {
            log::debug!("Plugin {} removed by plugin filter", plugin.descriptor());
        }
        kept
    }

    fn with_dependencies(plugins: &[PluginEntry], names: &[String]) -> HashSet<String> {
        let mut keep: HashSet<String> = HashSet::new();
        let mut pending: Vec<String> = names.to_vec();
        while let Some(name) = pending.pop() {
            if !keep.insert(name.clone()) {
                continue;
            }
            if let Some(plugin) = plugins.iter().find(|p| p.name() == name) {
                pending.extend(plugin.descriptor().dependency_names().into_iter().map(str::to_string));
            }
        }
        keep
    }

    fn with_dependents(plugins: &[PluginEntry], names: &[String]) -> HashSet<String> {
        let mut excluded: HashSet<String> = names.iter().cloned().collect();
        loop {
            let before = excluded.len();
            for plugin in plugins {
                if !excluded.contains(plugin.name())
                    && plugin
                        .descriptor()
                        .dependency_names()
                        .iter()
                        .any(|d| excluded.contains(*d))
                {
                    excluded.insert(plugin.name().to_string());
                }
            }
            if excluded.len() == before {
                return excluded;
            }
        }
    }
}
