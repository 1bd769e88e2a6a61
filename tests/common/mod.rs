//! Shared fixtures for the integration suite.
#![allow(dead_code)]

use domain_probe::metrics::MetricAssembler;
use domain_probe::models::{DomainRecord, MetricPoint, ProbeOutcome};
use domain_probe::orchestration::{ProbeContext, ProbeRunner};
use domain_probe::test_utils::{InMemoryRegistry, RecordingSink, ScriptedProbe};
use std::sync::Arc;

pub fn serviceable() -> ProbeOutcome {
    ProbeOutcome {
        serviceable: true,
        ttfb_us: 12_000,
        ttlb_us: 15_000,
        dns_us: 2_000,
        ssl_us: 0,
    }
}

pub fn numbered_records(count: usize) -> Vec<DomainRecord> {
    (1..=count as i64)
        .map(|n| DomainRecord::new(n, format!("org-{n}"), format!("d{n}.example")))
        .collect()
}

/// Probe answering every record's plain URL with a serviceable outcome
pub fn all_serviceable(records: &[DomainRecord]) -> ScriptedProbe {
    records.iter().fold(ScriptedProbe::new(), |probe, record| {
        probe.with_response(record.plain_url(), serviceable())
    })
}

pub fn runner(
    records: Vec<DomainRecord>,
    context: ProbeContext,
    chunk_size: usize,
) -> ProbeRunner {
    ProbeRunner::new(
        Arc::new(InMemoryRegistry::new(records)),
        Arc::new(context),
        chunk_size,
    )
}

pub fn context(probe: ScriptedProbe, sink: Arc<RecordingSink>) -> ProbeContext {
    ProbeContext::new(Arc::new(probe), MetricAssembler::default(), sink)
}

pub fn value_of(points: &[MetricPoint], metric: &str, organization_id: i64) -> Option<i64> {
    points
        .iter()
        .find(|p| p.metric == metric && p.tags.organization_id == organization_id)
        .map(|p| p.value)
}
