//! # Probe Runner
//!
//! One full run: read the registry once, stamp the run, dispatch, summarize.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::context::ProbeContext;
use super::dispatcher::ChunkDispatcher;
use super::summary::RunSummary;
use crate::database::DomainRegistry;

pub struct ProbeRunner {
    registry: Arc<dyn DomainRegistry>,
    dispatcher: ChunkDispatcher,
    chunk_size: usize,
}

impl ProbeRunner {
    pub fn new(
        registry: Arc<dyn DomainRegistry>,
        context: Arc<ProbeContext>,
        chunk_size: usize,
    ) -> Self {
        Self {
            registry,
            dispatcher: ChunkDispatcher::new(context),
            chunk_size,
        }
    }

    pub async fn run_once(&self) -> RunSummary {
        self.run_at(Utc::now().timestamp()).await
    }

    /// Run with an explicit timestamp shared by every point of the run.
    pub async fn run_at(&self, run_timestamp: i64) -> RunSummary {
        let records = self.registry.active_domains().await;
        info!(
            domains = records.len(),
            run_timestamp = run_timestamp,
            "Starting probe run"
        );

        let summary = self
            .dispatcher
            .dispatch(&records, self.chunk_size, run_timestamp)
            .await;

        summary.log();
        if !summary.is_clean() {
            warn!(
                batches_dropped = summary.batches_dropped,
                workers_panicked = summary.workers_panicked,
                "Probe run finished with losses"
            );
        }
        summary
    }
}
