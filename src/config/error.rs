//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to build configuration from {sources}: {message}")]
    Build { sources: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}

impl ConfigurationError {
    pub fn build_error(sources: impl Into<String>, error: ::config::ConfigError) -> Self {
        Self::Build {
            sources: sources.into(),
            message: error.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
