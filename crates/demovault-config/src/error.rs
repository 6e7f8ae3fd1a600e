//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration document failed.
    #[error("configuration io failure")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the configuration document.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration document was not valid YAML for the expected schema.
    #[error("configuration document could not be parsed")]
    Parse {
        /// Path of the document when it was read from disk.
        path: Option<PathBuf>,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Two server entries share the same identifier.
    #[error("duplicate server identifier")]
    DuplicateServer {
        /// Identifier that appeared more than once.
        server_id: String,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(
        section: impl Into<String>,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
