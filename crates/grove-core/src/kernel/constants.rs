// Application-wide constants

pub const APP_NAME: &str = "Grove";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework version plugins declare compatibility ranges against
pub const FRAMEWORK_VERSION: &str = "1.0.0";

// Environment
pub const ENV_VAR_ENVIRONMENT: &str = "GROVE_ENV";
pub const DEFAULT_ENVIRONMENT: &str = "development";

// Configuration
pub const CONFIG_FILE_STEM: &str = "application";
pub const CONFIG_ROOT_KEY: &str = "grove";
pub const ENVIRONMENTS_KEY: &str = "environments";

// Plugins
pub const PLUGIN_CLASS_SUFFIX: &str = "Plugin";
pub const MANIFEST_MARKER: &str = ".plugin."; // auth.plugin.toml
pub const WILDCARD_OBSERVER: &str = "*";
pub const DEFAULT_MAX_IDLE_ROUNDS: usize = 2;
pub const PLUGINS_PATH: &str = "/plugins";
pub const APP_DIR: &str = "grove-app";
pub const VIEWS_DIR: &str = "views";

/// Path components that mark the root of application sources.
/// Everything below the last marker forms the dotted class identifier.
pub const SOURCE_ROOTS: &[&str] = &["src", "app", "grove-app"];
