use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, parsing or interpreting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} configuration{}: {message}", path.as_ref().map(|p| format!(" '{}'", p.display())).unwrap_or_default())]
    Parse {
        format: String,
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Unsupported configuration format for '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Invalid configuration at '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn parse(format: &str, message: impl ToString) -> Self {
        ConfigError::Parse {
            format: format.to_string(),
            path: None,
            message: message.to_string(),
        }
    }

    pub(crate) fn with_path(self, file: &std::path::Path) -> Self {
        match self {
            ConfigError::Parse { format, message, .. } => ConfigError::Parse {
                format,
                path: Some(file.to_path_buf()),
                message,
            },
            other => other,
        }
    }
}
