//! # Domain Probe
//!
//! Runs one probe cycle: load configuration, open the organization registry,
//! probe every active domain and emit the metrics. Scheduling is left to the
//! caller (cron, a systemd timer, a Kubernetes CronJob).

use anyhow::Context;
use clap::Parser;
use domain_probe::config::ConfigManager;
use domain_probe::database::{PgDomainRegistry, RegistryConnection};
use domain_probe::logging::init_structured_logging;
use domain_probe::orchestration::{ProbeContext, ProbeRunner};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "domain-probe")]
#[command(about = "Probe organization domains and emit latency metrics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to load (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Override the configured chunk size
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Print the effective configuration and exit without probing
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "Probe run aborted");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir, &environment)
        .context("failed to load configuration")?;

    let mut config = manager.config().clone();
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
        config.validate().context("invalid --chunk-size")?;
    }

    if cli.check_config {
        let rendered = serde_json::to_string_pretty(&manager.debug_config())?;
        println!("{rendered}");
        return Ok(());
    }

    let connection =
        RegistryConnection::connect(&config.registry_dsn, config.registry_max_connections)
            .await
            .context("failed to open organization registry")?;
    let registry = Arc::new(PgDomainRegistry::new(connection.pool().clone()));
    let context = Arc::new(
        ProbeContext::from_config(&config).context("failed to build probe context")?,
    );

    let summary = ProbeRunner::new(registry, context, config.chunk_size)
        .run_once()
        .await;
    info!(
        environment = %environment,
        points_emitted = summary.points_emitted,
        points_dropped = summary.points_dropped,
        "Probe cycle finished"
    );

    connection.close().await;
    Ok(())
}
