//! # Domain Probe Configuration
//!
//! Layered configuration: compiled defaults, then `config/domain-probe.yaml`,
//! then `config/domain-probe.<environment>.yaml`, then `DOMAIN_PROBE__*`
//! environment variables (`__` separates nested keys).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use domain_probe::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let chunk_size = manager.config().chunk_size;
//! let timeout = manager.config().probe_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;
use crate::metrics::MetricFamilies;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{mask_dsn_password, ConfigManager};

/// Root configuration for a probe run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum domains per chunk worker
    pub chunk_size: usize,

    /// Deadline for one probe attempt, DNS through last body byte
    pub probe_timeout_ms: u64,

    /// Metric sink ingestion endpoint
    pub sink_url: String,

    /// Deadline for one sink POST; unset means no deadline
    pub sink_timeout_ms: Option<u64>,

    /// Organization registry connection string
    pub registry_dsn: String,

    pub registry_max_connections: u32,

    /// Cap on simultaneously active chunk workers; unset runs every chunk at once
    pub max_concurrent_chunks: Option<usize>,

    pub user_agent: String,

    pub page_load: PageLoadConfig,

    pub metrics: MetricsConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
            sink_url: defaults::SINK_URL.to_string(),
            sink_timeout_ms: None,
            registry_dsn: defaults::REGISTRY_DSN.to_string(),
            registry_max_connections: defaults::REGISTRY_MAX_CONNECTIONS,
            max_concurrent_chunks: None,
            user_agent: defaults::USER_AGENT.to_string(),
            page_load: PageLoadConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Full page-load measurement through a WebDriver endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PageLoadConfig {
    pub enabled: bool,

    /// Base URL of an already running WebDriver (e.g. `http://localhost:9515`)
    pub webdriver_url: Option<String>,

    /// Driver binary spawned per measurement when no running driver is configured
    pub driver_path: Option<String>,

    /// Deadline for one measurement; unset means no deadline
    pub timeout_ms: Option<u64>,

    /// Cap on simultaneously open browser sessions; unset means no cap
    pub max_concurrent_sessions: Option<usize>,
}

impl Default for PageLoadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webdriver_url: None,
            driver_path: None,
            timeout_ms: Some(defaults::PAGE_LOAD_TIMEOUT_MS),
            max_concurrent_sessions: Some(defaults::MAX_CONCURRENT_PAGE_LOADS),
        }
    }
}

impl PageLoadConfig {
    /// Whether a collaborator can be built from this configuration.
    pub fn is_available(&self) -> bool {
        self.enabled && (self.webdriver_url.is_some() || self.driver_path.is_some())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Metric naming and family selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prefix joined to each family with a dot; empty for bare family names
    pub namespace: String,
    pub include_dns: bool,
    pub include_ssl: bool,
    pub include_page_load: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::METRIC_NAMESPACE.to_string(),
            include_dns: true,
            include_ssl: true,
            include_page_load: true,
        }
    }
}

impl MetricsConfig {
    pub fn families(&self) -> MetricFamilies {
        MetricFamilies {
            include_dns: self.include_dns,
            include_ssl: self.include_ssl,
            include_page_load: self.include_page_load,
        }
    }
}

impl ProbeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn sink_timeout(&self) -> Option<Duration> {
        self.sink_timeout_ms.map(Duration::from_millis)
    }

    /// Whether page-load measurement will be attempted for serviceable domains.
    pub fn page_load_active(&self) -> bool {
        self.metrics.include_page_load && self.page_load.is_available()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.chunk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "chunk_size",
                "0",
                "chunk size must be greater than 0",
            ));
        }

        if self.probe_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "probe_timeout_ms",
                "0",
                "probe timeout must be greater than 0",
            ));
        }

        if self.registry_max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "registry_max_connections",
                "0",
                "registry pool size must be greater than 0",
            ));
        }

        validate_http_url("sink_url", &self.sink_url)?;

        if let Some(webdriver_url) = &self.page_load.webdriver_url {
            validate_http_url("page_load.webdriver_url", webdriver_url)?;
        }

        for (field, value) in [
            ("max_concurrent_chunks", self.max_concurrent_chunks),
            (
                "page_load.max_concurrent_sessions",
                self.page_load.max_concurrent_sessions,
            ),
        ] {
            if value == Some(0) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "concurrency cap must be greater than 0 when set",
                ));
            }
        }

        for (field, value) in [
            ("sink_timeout_ms", self.sink_timeout_ms),
            ("page_load.timeout_ms", self.page_load.timeout_ms),
        ] {
            if value == Some(0) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "timeout must be greater than 0 when set",
                ));
            }
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigurationError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigurationError::invalid_value(field, value, e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigurationError::invalid_value(
            field,
            value,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.sink_url, "http://localhost:4242/api/put");
        assert!(config.max_concurrent_chunks.is_none());
    }

    #[test]
    fn test_page_load_requires_a_driver() {
        let mut config = ProbeConfig::default();
        assert!(!config.page_load_active());

        config.page_load.webdriver_url = Some("http://localhost:9515".to_string());
        assert!(config.page_load_active());

        config.metrics.include_page_load = false;
        assert!(!config.page_load_active());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ProbeConfig {
            chunk_size: 0,
            ..ProbeConfig::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_zero_caps_rejected() {
        let mut config = ProbeConfig {
            max_concurrent_chunks: Some(0),
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());

        config.max_concurrent_chunks = Some(4);
        config.page_load.max_concurrent_sessions = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sink_url_must_be_http() {
        let config = ProbeConfig {
            sink_url: "ftp://metrics.internal/api/put".to_string(),
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ProbeConfig {
            sink_url: "not a url".to_string(),
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metric_families_follow_flags() {
        let metrics = MetricsConfig {
            include_ssl: false,
            ..MetricsConfig::default()
        };
        let families = metrics.families();
        assert!(families.include_dns);
        assert!(!families.include_ssl);
        assert!(families.include_page_load);
    }
}
