//! # Error Types
//!
//! Crate-level error taxonomy. Component errors (`ProbeError`, `PageLoadError`,
//! `EmissionError`) live beside their components and are absorbed there; only
//! configuration and registry-open failures reach the caller as `DomainProbeError`.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::emission::EmissionError;
use crate::page_load::PageLoadError;

#[derive(Debug, Error)]
pub enum DomainProbeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Registry error: {0}")]
    Registry(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TLS setup error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Sink setup error: {0}")]
    Emission(#[from] EmissionError),

    #[error("Page-load collaborator setup error: {0}")]
    PageLoad(#[from] PageLoadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainProbeError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error should abort the run rather than degrade it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Registry(_) | Self::Tls(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainProbeError>;
