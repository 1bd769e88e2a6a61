//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and a JSON
//! log file, plus helpers that log probe, emission, and registry operations as
//! structured fields.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::models::ProbeOutcome;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let log_dir = PathBuf::from("log");
        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(log_level.clone()));

        // File output is best effort: a read-only working directory still gets console logs.
        let (file_layer, guard) = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level));
                (Some(layer), Some(guard))
            }
            Err(_) => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_output = guard.is_some(),
            "🔧 STRUCTURED LOGGING: Initialized"
        );

        // The writer must outlive every worker; logging lives for the whole process.
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DOMAIN_PROBE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log one probe attempt with its phase timings
pub fn log_probe_operation(
    url: &str,
    status: Option<u16>,
    outcome: &ProbeOutcome,
    error: Option<&str>,
) {
    tracing::info!(
        url = %url,
        status = status,
        serviceable = outcome.serviceable,
        ttfb_us = outcome.ttfb_us,
        ttlb_us = outcome.ttlb_us,
        dns_us = outcome.dns_us,
        ssl_us = outcome.ssl_us,
        error = error,
        "🔎 PROBE_OPERATION"
    );
}

/// Log delivery of one batch to the sink
pub fn log_emission_operation(
    operation: &str,
    points: usize,
    status: Option<u16>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        points = points,
        status = status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📤 EMISSION_OPERATION"
    );
}

/// Log a registry read
pub fn log_registry_operation(
    operation: &str,
    records: usize,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        records = records,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 REGISTRY_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
