//! End-of-run behavior for representative registries.

mod common;

use common::*;
use domain_probe::models::DomainRecord;
use domain_probe::page_load::PageLoadAdapter;
use domain_probe::test_utils::{FixedPageLoad, RecordingSink, ScriptedProbe};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn two_serviceable_domains_fill_one_batch() {
    let records = vec![
        DomainRecord::new(1, "Acme", "a.example"),
        DomainRecord::new(2, "Beta", "b.example"),
    ];
    let sink = Arc::new(RecordingSink::new());
    let page_load = PageLoadAdapter::new(Arc::new(FixedPageLoad::succeeding(2_400_000)));
    let context = context(all_serviceable(&records), sink.clone()).with_page_load(Some(page_load));

    let summary = runner(records, context, 10).run_at(1_700_000_000).await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.len(), 12);
    assert!(batch.iter().all(|p| p.timestamp == 1_700_000_000));
    assert_eq!(value_of(batch, "domain.uptime", 1), Some(1));
    assert_eq!(value_of(batch, "domain.uptime", 2), Some(1));
    assert_eq!(value_of(batch, "domain.pageLoad", 2), Some(2_400_000));
    assert_eq!(summary.page_loads_attempted, 2);
    assert_eq!(summary.points_emitted, 12);
}

#[tokio::test]
async fn unreachable_domain_gets_five_points_and_no_page_load() {
    let records = vec![DomainRecord::new(3, "Dead", "dead.invalid")];
    let sink = Arc::new(RecordingSink::new());
    let collaborator = Arc::new(FixedPageLoad::succeeding(1));
    let context = context(ScriptedProbe::new(), sink.clone())
        .with_page_load(Some(PageLoadAdapter::new(collaborator.clone())));

    let summary = runner(records, context, 10).run_at(42).await;

    let batch = &sink.batches()[0];
    assert_eq!(batch.len(), 5);
    assert_eq!(value_of(batch, "domain.uptime", 3), Some(0));
    assert_eq!(value_of(batch, "domain.pageLoad", 3), None);
    assert_eq!(collaborator.calls(), 0);
    assert_eq!(summary.unserviceable, 1);
}

#[tokio::test]
async fn twenty_five_records_make_three_batches() {
    let records = numbered_records(25);
    // Odd ids are serviceable, even ids fail both schemes.
    let probe = records
        .iter()
        .filter(|r| r.id % 2 == 1)
        .fold(ScriptedProbe::new(), |probe, r| {
            probe.with_response(r.plain_url(), serviceable())
        });
    let sink = Arc::new(RecordingSink::new());
    let page_load = PageLoadAdapter::new(Arc::new(FixedPageLoad::failing()));
    let context = context(probe, sink.clone()).with_page_load(Some(page_load));

    let summary = runner(records, context, 10).run_at(42).await;

    let mut sizes: Vec<usize> = sink
        .batches()
        .iter()
        .map(|batch| {
            batch
                .iter()
                .map(|p| p.tags.organization_id)
                .collect::<HashSet<_>>()
                .len()
        })
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 10, 10]);

    // 13 serviceable domains carry a sentinel pageLoad point on top of the base five.
    assert_eq!(sink.total_points(), 25 * 5 + 13);
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.page_loads_failed, 13);
    assert!(sink
        .batches()
        .iter()
        .flatten()
        .filter(|p| p.metric == "domain.pageLoad")
        .all(|p| p.value == -1));
}

#[tokio::test]
async fn empty_registry_emits_nothing() {
    let sink = Arc::new(RecordingSink::new());
    let summary = runner(Vec::new(), context(ScriptedProbe::new(), sink.clone()), 10)
        .run_once()
        .await;

    assert_eq!(summary.chunks, 0);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn secure_fallback_result_is_reported() {
    let record = DomainRecord::new(9, "Secure", "s.example");
    let probe = ScriptedProbe::new().with_response(record.secure_url(), serviceable());
    let sink = Arc::new(RecordingSink::new());

    runner(vec![record], context(probe, sink.clone()), 10)
        .run_at(42)
        .await;

    let batch = &sink.batches()[0];
    assert_eq!(value_of(batch, "domain.uptime", 9), Some(1));
    assert_eq!(value_of(batch, "domain.ttfb", 9), Some(12_000));
}
