//! # Chunk Dispatcher
//!
//! Fans a run out into one task per chunk and joins them all before
//! returning. Inside a chunk, domains are handled strictly in order: fallback
//! probe, optional page load, assembly. The chunk's points form a single
//! batch that is handed to the sink once the last domain is done.
//!
//! Fan-out is one task per chunk unless `max_concurrent_chunks` caps the
//! number of chunks in flight.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::chunking::partition;
use super::context::ProbeContext;
use super::summary::{ChunkReport, RunSummary};
use crate::logging::log_error;
use crate::models::{Batch, DomainRecord};

#[derive(Debug, Clone)]
pub struct ChunkDispatcher {
    context: Arc<ProbeContext>,
}

impl ChunkDispatcher {
    pub fn new(context: Arc<ProbeContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ProbeContext {
        &self.context
    }

    /// Probe every record and emit one batch per chunk. Returns once every
    /// chunk task has finished.
    pub async fn dispatch(
        &self,
        records: &[DomainRecord],
        chunk_size: usize,
        run_timestamp: i64,
    ) -> RunSummary {
        let chunks = partition(records, chunk_size);
        let mut summary = RunSummary {
            chunks: chunks.len(),
            ..Default::default()
        };
        if chunks.is_empty() {
            info!("No domains to probe");
            return summary;
        }

        let started = Instant::now();
        let limiter = self
            .context
            .max_concurrent_chunks
            .map(|permits| Arc::new(Semaphore::new(permits)));

        info!(
            chunks = chunks.len(),
            domains = records.len(),
            chunk_size = chunk_size,
            run_timestamp = run_timestamp,
            "Dispatching probe chunks"
        );

        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let context = Arc::clone(&self.context);
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    // A closed semaphore only happens on shutdown; run uncapped then.
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    run_chunk(&context, index, chunk, run_timestamp).await
                })
            })
            .collect();

        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(report) => summary.record_chunk(&report),
                Err(e) => {
                    log_error(
                        "chunk_dispatcher",
                        "join_chunk",
                        &e.to_string(),
                        Some(&format!("chunk={index}")),
                    );
                    summary.record_panic();
                }
            }
        }

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "All probe chunks joined"
        );
        summary
    }
}

async fn run_chunk(
    context: &ProbeContext,
    index: usize,
    chunk: Vec<DomainRecord>,
    run_timestamp: i64,
) -> ChunkReport {
    let mut batch = Batch::with_capacity(chunk.len() * 6);
    let mut serviceable = 0;
    let mut page_loads_attempted = 0;
    let mut page_loads_failed = 0;

    for record in &chunk {
        let outcome = context.fallback.resolve(&record.domain).await;

        let page_load = match &context.page_load {
            Some(adapter)
                if outcome.serviceable && context.assembler.families().include_page_load =>
            {
                page_loads_attempted += 1;
                let result = adapter.estimate(&record.page_url()).await;
                if !result.is_measured() {
                    page_loads_failed += 1;
                }
                Some(result)
            }
            _ => None,
        };

        if outcome.serviceable {
            serviceable += 1;
        }
        batch.extend(
            context
                .assembler
                .assemble(record, &outcome, page_load, run_timestamp),
        );
    }

    let emission = context.sink.emit(batch).await;
    debug!(
        chunk = index,
        domains = chunk.len(),
        serviceable = serviceable,
        points = emission.points(),
        delivered = emission.is_delivered(),
        "Chunk finished"
    );

    ChunkReport {
        domains: chunk.len(),
        serviceable,
        page_loads_attempted,
        page_loads_failed,
        emission,
    }
}
