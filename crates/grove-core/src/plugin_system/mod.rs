//! # Grove Core Plugin System
//!
//! Discovery, ordering, registration and lifecycle management of plugins.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`descriptor`]**: The declarative model of one plugin ([`PluginDescriptor`]):
//!   name, version, dependencies, ordering hints, evictions, observations and
//!   watched resources.
//! - **[`compat`]**: Advisory framework-version compatibility checks.
//! - **[`dependency`]**: Dependency declarations and the [`DependencyResolver`]
//!   computing the final load order.
//! - **[`scheduler`]**: Two-pass registration with a bounded delayed-load queue.
//! - **[`eviction`]** and **[`observer`]**: Deferred eviction and observer fan-out.
//! - **[`lifecycle`]**: The [`LifecycleCoordinator`] and its per-phase failure policies.
//! - **[`loader`]**, **[`manifest`]** and **[`classes`]**: Candidate discovery from
//!   class tables and manifest files.
//! - **[`manager`]**: The [`PluginManager`] facade composing everything above.
//! - **[`reload`]**: A serialized queue delivering hot-reload notifications.
pub mod classes;
pub mod compat;
pub mod dependency;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod eviction;
pub mod filter;
pub mod lifecycle;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod observer;
pub mod registry;
pub mod reload;
pub mod scheduler;
pub mod traits;
pub mod version;

pub use classes::{BasicPlugin, ClassResolver, PluginClass, StaticClassResolver};
pub use compat::{Compatibility, CompatibilityChecker};
pub use dependency::{CyclePolicy, DependencyResolver, PluginDependency};
pub use descriptor::{PluginDescriptor, PluginOrigin, PluginState, WatchPattern};
pub use error::PluginSystemError;
pub use lifecycle::{LifecycleCoordinator, LifecyclePhase, PhasePolicy, PhaseReport};
pub use loader::PluginLoader;
pub use manager::{ManagerSettings, PluginManager};
pub use registry::{PluginEntry, PluginRegistry};
pub use traits::{Plugin, PluginError, PluginResult, StartupHook};
pub use version::VersionRequirement;

// Test module declaration
#[cfg(test)]
mod tests;
