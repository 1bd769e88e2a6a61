//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles environment detection,
//! layering of YAML files and environment variables, validation, and
//! sanitized logging of the result.

use super::error::{ConfigResult, ConfigurationError};
use super::ProbeConfig;
use ::config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "domain-probe";
const ENV_PREFIX: &str = "DOMAIN_PROBE";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ProbeConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        if !config_directory.is_dir() && config_directory != Path::new("config") {
            return Err(ConfigurationError::DirectoryNotFound(config_directory));
        }

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_layers(&config_directory, environment)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = environment,
            chunk_size = config.chunk_size,
            probe_timeout_ms = config.probe_timeout_ms,
            sink_url = %config.sink_url,
            page_load_active = config.page_load_active(),
            "⚙️ CONFIG: Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: ProbeConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Get sanitized configuration for debugging/logging that masks credentials
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("DOMAIN_PROBE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_layers(config_directory: &Path, environment: &str) -> ConfigResult<ProbeConfig> {
        let base_file = config_directory.join(format!("{BASE_FILE_STEM}.yaml"));
        let env_file = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.yaml"));

        let sources = format!("{}, {}", base_file.display(), env_file.display());

        let layered = Config::builder()
            .add_source(File::from(base_file.as_path()).required(false))
            .add_source(File::from(env_file.as_path()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::build_error(sources.clone(), e))?;

        layered
            .try_deserialize::<ProbeConfig>()
            .map_err(|e| ConfigurationError::build_error(sources, e))
    }

    /// Sanitize configuration for safe logging by masking credentials
    fn sanitize_config_for_logging(config: &ProbeConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);

        if let Some(dsn) = config_json.get_mut("registry_dsn") {
            *dsn = serde_json::Value::String(mask_dsn_password(&config.registry_dsn));
        }

        Self::sanitize_json_recursive(&mut config_json, &["password", "secret", "token"]);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    if sensitive_patterns.iter().any(|p| key_lower.contains(p)) {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

/// Replace the password component of a connection string, if any.
pub fn mask_dsn_password(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_ok() {
                parsed.to_string()
            } else {
                "[MASKED]".to_string()
            }
        }
        Ok(_) => dsn.to_string(),
        Err(_) => "[MASKED]".to_string(),
    }
}
