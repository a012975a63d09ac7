use crate::plugin_system::registry::PluginRegistry;
use crate::utils::naming::normalize_plugin_name;

/// One applied eviction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub evictor: String,
    pub evictee: String,
}

/// Evictions recorded at registration time and applied once all
/// registration passes are done.
#[derive(Debug, Default)]
pub struct EvictionManager {
    pending: Vec<(String, Vec<String>)>,
    applied: Vec<Eviction>,
}

impl EvictionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<S: AsRef<str>>(&mut self, evictor: &str, evictees: &[S]) {
        if evictees.is_empty() {
            return;
        }
        let names = evictees
            .iter()
            .map(|n| normalize_plugin_name(n.as_ref()))
            .collect();
        self.pending.push((evictor.to_string(), names));
    }

    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(|(_, names)| names.len()).sum()
    }

    /// Remove every recorded evictee from `registry`.
    ///
    /// Evictions do not cascade: plugins depending on an evicted plugin stay
    /// registered and are only reported.
    pub fn apply(&mut self, registry: &mut PluginRegistry) -> Vec<Eviction> {
        let mut applied = Vec::new();
        for (evictor, names) in std::mem::take(&mut self.pending) {
            for evictee in names {
                if registry.remove(&evictee).is_some() {
                    log::info!("Plugin [{}] was evicted by [{}]", evictee, evictor);
                    applied.push(Eviction {
                        evictor: evictor.clone(),
                        evictee,
                    });
                }
            }
        }

        for eviction in &applied {
            for dependent in registry
                .iter()
                .filter(|e| e.descriptor().dependency_names().contains(&eviction.evictee.as_str()))
            {
                log::warn!(
                    "Plugin [{}] depends on evicted plugin [{}] and keeps a stale dependency",
                    dependent.name(),
                    eviction.evictee
                );
            }
        }

        self.applied.extend(applied.iter().cloned());
        applied
    }

    pub fn was_evicted(&self, name: &str) -> bool {
        let name = normalize_plugin_name(name);
        self.applied.iter().any(|e| e.evictee == name)
    }

    pub fn applied(&self) -> &[Eviction] {
        &self.applied
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.applied.clear();
    }
}
