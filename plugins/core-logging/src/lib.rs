//! Core plugin installing the process-wide log subscriber.
//!
//! Settings come from the `logging` table of the application configuration:
//!
//! ```toml
//! [logging]
//! level = "grove_core=debug,info"
//! format = "json"
//! ```
//!
//! A non-empty `GROVE_LOG` environment variable overrides `level`.

use std::sync::atomic::{AtomicBool, Ordering};

use grove_core::config::ConfigTree;
use grove_core::plugin_system::classes::PluginClass;
use grove_core::plugin_system::descriptor::PluginDescriptor;
use grove_core::{Application, Plugin, PluginError, PluginResult};
use log::{info, warn};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub const LOGGING_PLUGIN_CLASS: &str = "grove.plugins.CoreLoggingPlugin";
pub const ENV_VAR_LOG: &str = "GROVE_LOG";
const LOGGING_KEY: &str = "logging";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The `logging.*` settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingSettings {
    /// Read settings from `config`, falling back to defaults on bad values
    pub fn from_config(config: &ConfigTree) -> Self {
        config
            .subtree(LOGGING_KEY)
            .deserialize_into()
            .unwrap_or_else(|e| {
                eprintln!("Ignoring invalid logging configuration: {}", e);
                Self::default()
            })
    }

    /// Filter directive, preferring a non-empty override
    pub fn directive(&self, env_override: Option<&str>) -> String {
        match env_override.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => self.level.clone(),
        }
    }

    pub fn env_filter(&self, env_override: Option<&str>) -> PluginResult<EnvFilter> {
        let directive = self.directive(env_override);
        EnvFilter::try_new(&directive)
            .map_err(|e| PluginError::Configuration(format!("invalid log filter '{}': {}", directive, e)))
    }
}

/// Install the subscriber and the `log` bridge for the whole process.
/// Output goes to stderr.
pub fn install(settings: &LoggingSettings) -> PluginResult<()> {
    let env_override = std::env::var(ENV_VAR_LOG).ok();
    let filter = settings.env_filter(env_override.as_deref())?;

    let result = match settings.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish(),
        ),
    };
    result.map_err(|e| PluginError::Configuration(format!("Failed to set subscriber: {}", e)))?;

    tracing_log::LogTracer::init()
        .map_err(|e| PluginError::Configuration(format!("Failed to bridge log records: {}", e)))
}

#[derive(Debug, Default)]
pub struct LoggingPlugin {
    installed: AtomicBool,
}

impl LoggingPlugin {
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new("core-logging", env!("CARGO_PKG_VERSION")).framework_version("1.0 > *")
    }

    /// Class registration for a [`ClassResolver`](grove_core::ClassResolver)
    pub fn class() -> PluginClass {
        PluginClass::new(LOGGING_PLUGIN_CLASS, || Box::new(LoggingPlugin::default()))
            .with_descriptor(Self::descriptor())
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

impl Plugin for LoggingPlugin {
    fn set_application(&self, application: &Application) {
        if self.installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let settings = LoggingSettings::from_config(application.config());
        match install(&settings) {
            Ok(()) => info!("Logging initialised at '{}' ({:?})", settings.level, settings.format),
            // Another subscriber owns the process; keep using it
            Err(e) => warn!("Logging subscriber not installed: {}", e),
        }
    }
}
