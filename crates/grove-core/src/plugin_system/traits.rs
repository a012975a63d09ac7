use std::sync::Arc;

use crate::event::{EventMap, PluginEvent};
use crate::kernel::artefact::ArtefactRegistry;
use crate::kernel::bootstrap::Application;
use crate::kernel::context::{ApplicationContext, RuntimeConfiguration};
use crate::plugin_system::dispatch::DispatchRegistry;

/// Errors raised by plugin hooks
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin configuration error: {0}")]
    Configuration(String),
    #[error("Plugin execution error: {0}")]
    Execution(String),
    #[error("Plugin reload error: {0}")]
    Reload(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type PluginResult<T> = std::result::Result<T, PluginError>;

/// Capability of plugins that react to application startup
pub trait StartupHook: Send + Sync {
    fn on_startup(&self, event: &EventMap) -> PluginResult<()>;
}

/// Behaviour of a plugin instance.
///
/// Declarative metadata (name, version, ordering, watch patterns) lives in
/// the [`PluginDescriptor`](crate::plugin_system::PluginDescriptor); this
/// trait only carries the lifecycle hooks. Every hook defaults to a no-op so
/// plugins implement just the phases they take part in.
pub trait Plugin: Send + Sync {
    /// Receive the application the plugin was registered into
    fn set_application(&self, _application: &Application) {}

    /// Receive the shared application context
    fn set_application_context(&self, _context: &Arc<ApplicationContext>) {}

    /// Register artefact handlers and artefacts
    fn do_artefact_configuration(&self, _artefacts: &mut ArtefactRegistry) -> PluginResult<()> {
        Ok(())
    }

    /// Contribute bean definitions
    fn do_with_runtime_configuration(
        &self,
        _config: &mut RuntimeConfiguration,
        _application: &Application,
    ) -> PluginResult<()> {
        Ok(())
    }

    /// Install dynamic behaviour into the dispatch registry
    fn do_with_dynamic_methods(
        &self,
        _context: &ApplicationContext,
        _dispatch: &mut DispatchRegistry,
    ) -> PluginResult<()> {
        Ok(())
    }

    /// Wire against the fully built application context
    fn do_with_application_context(&self, _context: &ApplicationContext) -> PluginResult<()> {
        Ok(())
    }

    /// Handle a change, configuration or shutdown notification
    fn notify_of_event(&self, _event: &PluginEvent) -> PluginResult<()> {
        Ok(())
    }

    /// Re-read plugin state after a refresh request
    fn refresh(&self) -> PluginResult<()> {
        Ok(())
    }

    fn startup_hook(&self) -> Option<&dyn StartupHook> {
        None
    }
}
