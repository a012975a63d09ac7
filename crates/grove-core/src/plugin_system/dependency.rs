use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::version::VersionRequirement;
use crate::utils::naming::normalize_plugin_name;

/// A hard dependency on another plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDependency {
    /// The name of the required plugin (normalized)
    pub plugin_name: String,

    /// The versions that satisfy the dependency
    pub version_range: VersionRequirement,
}

/// Error that can occur when resolving dependencies
#[derive(Debug, Error)]
pub enum DependencyError {
    /// Dependency cycle detected
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// The required plugin was not found
    #[error("Required plugin not found: {0}")]
    MissingPlugin(String),
}

impl PluginDependency {
    /// Create a dependency with a specific version requirement
    pub fn new(plugin_name: &str, version_range: VersionRequirement) -> Self {
        Self {
            plugin_name: normalize_plugin_name(plugin_name),
            version_range,
        }
    }

    /// Create a dependency on any version
    pub fn any(plugin_name: &str) -> Self {
        Self::new(plugin_name, VersionRequirement::Any)
    }

    /// Check if this dependency is satisfied by the given plugin
    pub fn is_satisfied_by(&self, name: &str, version: &str) -> bool {
        self.plugin_name == name && self.version_range.is_satisfied_by(version)
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.plugin_name, self.version_range)
    }
}

/// How the resolver treats cycles in the predecessor graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePolicy {
    /// Log the cycle and keep the first-visit order
    #[default]
    Tolerate,
    /// Fail resolution with [`DependencyError::CyclicDependency`]
    Reject,
}

/// Output of [`DependencyResolver::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub order: Vec<String>,
    /// Every cycle met during the walk, each closed on its first element
    pub cycles: Vec<Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Computes the final load order from load-after, load-before and
/// dependency edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    policy: CyclePolicy,
}

impl DependencyResolver {
    pub fn new(policy: CyclePolicy) -> Self {
        Self { policy }
    }

    /// For each plugin, the names that must precede it. Edges naming
    /// plugins outside `nodes` are dropped.
    pub fn predecessor_graph(&self, nodes: &[&PluginDescriptor]) -> HashMap<String, Vec<String>> {
        let known: HashSet<&str> = nodes.iter().map(|d| d.name.as_str()).collect();
        let mut graph: HashMap<String, Vec<String>> = nodes
            .iter()
            .map(|d| (d.name.clone(), Vec::new()))
            .collect();

        fn add_edge(graph: &mut HashMap<String, Vec<String>>, node: &str, predecessor: &str) {
            if node == predecessor {
                return;
            }
            if let Some(preds) = graph.get_mut(node) {
                if !preds.iter().any(|p| p == predecessor) {
                    preds.push(predecessor.to_string());
                }
            }
        }

        for descriptor in nodes {
            let name = descriptor.name.as_str();
            let after = descriptor
                .load_after
                .iter()
                .map(String::as_str)
                .chain(descriptor.dependencies.iter().map(|d| d.plugin_name.as_str()));
            for predecessor in after {
                if known.contains(predecessor) {
                    add_edge(&mut graph, name, predecessor);
                }
            }
            for successor in &descriptor.load_before {
                if known.contains(successor.as_str()) {
                    add_edge(&mut graph, successor, name);
                }
            }
        }
        graph
    }

    /// Depth-first ordering of `nodes`, visited in the given order.
    ///
    /// Each node is emitted after all of its predecessors. A predecessor
    /// found in progress closes a cycle; the walk does not descend into it.
    pub fn resolve(&self, nodes: &[&PluginDescriptor]) -> Result<ResolvedOrder, DependencyError> {
        let graph = self.predecessor_graph(nodes);
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(nodes.len());
        let mut result = ResolvedOrder::default();
        // (node, index of the next predecessor to visit)
        let mut stack: Vec<(&str, usize)> = Vec::new();

        for root in nodes {
            let root = root.name.as_str();
            if marks.contains_key(root) {
                continue;
            }
            marks.insert(root, Mark::InProgress);
            stack.push((root, 0));

            while let Some((node, next)) = stack.last_mut() {
                let preds = graph.get(*node).map(Vec::as_slice).unwrap_or(&[]);
                if *next < preds.len() {
                    let pred = preds[*next].as_str();
                    *next += 1;
                    match marks.get(pred) {
                        None => {
                            marks.insert(pred, Mark::InProgress);
                            stack.push((pred, 0));
                        }
                        Some(Mark::InProgress) => {
                            let start = stack.iter().position(|(n, _)| *n == pred).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                            cycle.push(pred.to_string());
                            result.cycles.push(cycle);
                        }
                        Some(Mark::Done) => {}
                    }
                } else {
                    let node = *node;
                    stack.pop();
                    marks.insert(node, Mark::Done);
                    result.order.push(node.to_string());
                }
            }
        }

        if let Some(first) = result.cycles.first() {
            match self.policy {
                CyclePolicy::Reject => return Err(DependencyError::CyclicDependency(first.clone())),
                CyclePolicy::Tolerate => {
                    for cycle in &result.cycles {
                        log::warn!(
                            "Plugin ordering cycle detected ({}); keeping first-visit order",
                            cycle.join(" -> ")
                        );
                    }
                }
            }
        }

        Ok(result)
    }
}
