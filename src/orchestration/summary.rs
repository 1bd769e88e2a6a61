//! # Run Summary
//!
//! Per-run tallies built from the values workers return. Nothing here is
//! shared while workers run; each worker reports once and the dispatcher
//! folds the reports after the join.

use serde::Serialize;
use tracing::info;

use crate::emission::EmitOutcome;

/// What one chunk worker did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub domains: usize,
    pub serviceable: usize,
    pub page_loads_attempted: usize,
    pub page_loads_failed: usize,
    pub emission: EmitOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub chunks: usize,
    pub domains: usize,
    pub serviceable: usize,
    pub unserviceable: usize,
    pub page_loads_attempted: usize,
    pub page_loads_failed: usize,
    pub batches_emitted: usize,
    pub batches_dropped: usize,
    pub points_emitted: usize,
    pub points_dropped: usize,
    pub workers_panicked: usize,
}

impl RunSummary {
    pub fn record_chunk(&mut self, report: &ChunkReport) {
        self.domains += report.domains;
        self.serviceable += report.serviceable;
        self.unserviceable += report.domains - report.serviceable;
        self.page_loads_attempted += report.page_loads_attempted;
        self.page_loads_failed += report.page_loads_failed;

        match report.emission {
            EmitOutcome::Delivered { points } => {
                self.batches_emitted += 1;
                self.points_emitted += points;
            }
            EmitOutcome::Dropped { points } => {
                self.batches_dropped += 1;
                self.points_dropped += points;
            }
        }
    }

    pub fn record_panic(&mut self) {
        self.workers_panicked += 1;
    }

    /// Whether every batch reached the sink and every worker finished.
    pub fn is_clean(&self) -> bool {
        self.batches_dropped == 0 && self.workers_panicked == 0
    }

    pub fn log(&self) {
        info!(
            chunks = self.chunks,
            domains = self.domains,
            serviceable = self.serviceable,
            unserviceable = self.unserviceable,
            page_loads_attempted = self.page_loads_attempted,
            page_loads_failed = self.page_loads_failed,
            batches_emitted = self.batches_emitted,
            batches_dropped = self.batches_dropped,
            points_emitted = self.points_emitted,
            points_dropped = self.points_dropped,
            workers_panicked = self.workers_panicked,
            "Probe run complete"
        );
    }
}
