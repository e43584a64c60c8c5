//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A file or directory could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A model unit is not valid YAML for the schema
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Unit path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// A model unit parsed but failed validation
    #[error("invalid model config {}: {source}", path.display())]
    Validation {
        /// Unit path
        path: PathBuf,
        /// Field errors
        #[source]
        source: validator::ValidationErrors,
    },

    /// The unit's file name does not yield a model id
    #[error("cannot derive a model id from {}", path.display())]
    InvalidModelId {
        /// Unit path
        path: PathBuf,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
