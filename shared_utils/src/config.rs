use thiserror::Error;

use crate::env::MissingEnvVarError;

/// Errors related to application configuration.
///
/// Every variant is fatal at startup: the caller reports it and exits.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A configuration value is present but unusable.
    #[error("Invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key (e.g. `storage.file_pattern`).
        field: String,
        /// Human readable explanation.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("Cannot read configuration file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected shape.
    #[error("Cannot parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<MissingEnvVarError> for ConfigError {
    fn from(e: MissingEnvVarError) -> Self {
        Self::MissingEnvVar(e.0)
    }
}
