#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, WebDriver in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Domain Probe
//!
//! Periodic reachability and latency probing for organization domains, with
//! the results emitted as tagged metric points to a time-series sink.
//!
//! ## Overview
//!
//! Each run reads the active domains from the organization registry, splits
//! them into chunks and probes every chunk concurrently. A domain is probed
//! over the plain scheme first and the secure scheme second; the request is
//! instrumented for DNS, TLS handshake, time-to-first-byte and
//! time-to-last-byte. Serviceable domains can additionally get a full
//! page-load measurement from a WebDriver session. Every chunk's points are
//! sent to the sink as one batch.
//!
//! ## Module Organization
//!
//! - [`models`] - domain records, probe outcomes and metric points
//! - [`probe`] - instrumented prober and scheme fallback
//! - [`page_load`] - WebDriver page-load collaborator and its bounded adapter
//! - [`metrics`] - metric point assembly
//! - [`emission`] - batch delivery to the sink
//! - [`orchestration`] - chunk dispatch and the run entrypoint
//! - [`database`] - organization registry access
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup and helpers
//! - [`error`] - crate-level errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_probe::config::ConfigManager;
//! use domain_probe::database::{PgDomainRegistry, RegistryConnection};
//! use domain_probe::orchestration::{ProbeContext, ProbeRunner};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let connection =
//!     RegistryConnection::connect(&config.registry_dsn, config.registry_max_connections).await?;
//! let registry = Arc::new(PgDomainRegistry::new(connection.pool().clone()));
//! let context = Arc::new(ProbeContext::from_config(config)?);
//!
//! let summary = ProbeRunner::new(registry, context, config.chunk_size)
//!     .run_once()
//!     .await;
//! println!("emitted {} points", summary.points_emitted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod emission;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod page_load;
pub mod probe;
pub mod test_utils;

pub use config::{ConfigManager, ProbeConfig};
pub use error::{DomainProbeError, Result};
pub use models::{Batch, DomainRecord, MetricPoint, PageLoadResult, ProbeOutcome, Tags};
pub use orchestration::{ChunkDispatcher, ProbeContext, ProbeRunner, RunSummary};
