//! # Grove Configuration
//!
//! Hierarchical application configuration.
//!
//! [`ConfigTree`] holds a JSON-shaped tree addressed by dotted keys and
//! supports deep merging. [`ConfigParser`] implementations turn files into
//! trees; [`FileConfigParser`] understands JSON, and TOML and YAML behind the
//! `toml-config` and `yaml-config` features, applies the block for the
//! current environment and expands `${name}` bindings.
pub mod error;
pub mod parser;
pub mod tree;

pub use error::ConfigError;
pub use parser::{ConfigBindings, ConfigFormat, ConfigParser, FileConfigParser};
pub use tree::ConfigTree;

#[cfg(test)]
mod tests;
