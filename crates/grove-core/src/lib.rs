pub mod config;
pub mod event;
pub mod kernel;
pub mod plugin_system;
pub mod utils;

// Re-export key types for convenience
pub use config::{ConfigFormat, ConfigTree, FileConfigParser};
pub use event::{EventMap, PluginEvent, PluginEventKind};
pub use kernel::bootstrap::{AppMetadata, Application, Environment};
pub use kernel::context::{ApplicationContext, BeanSpec, RuntimeConfiguration};
pub use kernel::error::{Error, Result};
pub use plugin_system::{
    ClassResolver, Plugin, PluginDescriptor, PluginEntry, PluginError, PluginLoader, PluginManager,
    PluginResult, PluginSystemError, StaticClassResolver,
};
