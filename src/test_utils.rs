//! # Test Utilities
//!
//! Scripted stand-ins for the network-facing seams (prober, page-load
//! collaborator, sink, registry) so that orchestration can be exercised
//! without real hosts. Shared by unit tests and the `tests/` suite.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::database::DomainRegistry;
use crate::emission::{EmitOutcome, MetricSink};
use crate::models::{Batch, DomainRecord, ProbeOutcome};
use crate::page_load::{PageLoadCollaborator, PageLoadError};
use crate::probe::LatencyProbe;

/// Prober answering from a fixed URL table. Unknown URLs are unreachable.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    responses: HashMap<String, ProbeOutcome>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, outcome: ProbeOutcome) -> Self {
        self.responses.insert(url.into(), outcome);
        self
    }

    /// URLs probed so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LatencyProbe for ScriptedProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.lock().push(url.to_string());
        self.responses
            .get(url)
            .copied()
            .unwrap_or_else(ProbeOutcome::unreachable)
    }
}

/// Page-load collaborator returning one fixed result after an optional delay
#[derive(Debug)]
pub struct FixedPageLoad {
    value_us: Option<i64>,
    delay: Option<Duration>,
    urls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FixedPageLoad {
    pub fn succeeding(value_us: i64) -> Self {
        Self::with_value(Some(value_us))
    }

    pub fn failing() -> Self {
        Self::with_value(None)
    }

    fn with_value(value_us: Option<i64>) -> Self {
        Self {
            value_us,
            delay: None,
            urls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Highest number of measurements observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLoadCollaborator for FixedPageLoad {
    async fn measure(&self, url: &str) -> Result<i64, PageLoadError> {
        self.urls.lock().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.value_us
            .ok_or_else(|| PageLoadError::navigation(url, "scripted failure"))
    }
}

/// Sink that keeps every batch it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Batch>>,
    reject: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that records batches but reports every one as dropped
    pub fn rejecting() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    pub fn total_points(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn emit(&self, batch: Batch) -> EmitOutcome {
        let points = batch.len();
        self.batches.lock().push(batch);
        if self.reject {
            EmitOutcome::Dropped { points }
        } else {
            EmitOutcome::Delivered { points }
        }
    }
}

/// Registry serving a fixed record list
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    records: Vec<DomainRecord>,
}

impl InMemoryRegistry {
    pub fn new(records: Vec<DomainRecord>) -> Self {
        Self { records }
    }

    /// `count` records named `org-<n>` on `d<n>.example`, ids from 1
    pub fn numbered(count: usize) -> Self {
        let records = (1..=count as i64)
            .map(|n| DomainRecord::new(n, format!("org-{n}"), format!("d{n}.example")))
            .collect();
        Self { records }
    }
}

#[async_trait]
impl DomainRegistry for InMemoryRegistry {
    async fn active_domains(&self) -> Vec<DomainRecord> {
        self.records.clone()
    }
}
