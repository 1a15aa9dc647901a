//! Fan-out across sources: windows, isolation, rebuilds and backfills
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{dst_line, dst_source, FlakyStore, PanickingClient, ScriptedClient};
use gme_ingest::decode::{IagaDecoder, OmniDecoder};
use gme_ingest::error::IngestError;
use gme_ingest::job::SyncIssue;
use gme_ingest::record::{Dataset, Document, NaturalKey};
use gme_ingest::source::{IngestSource, SourceClient};
use gme_ingest::store::{MemoryStore, RecordStore};
use gme_ingest::{Orchestrator, RunContext, SyncMode};
use serde_json::json;

fn mid_2024(mode: SyncMode) -> RunContext {
    RunContext::at(mode, Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
}

fn omni_source(id: &str, client: Arc<dyn SourceClient>, res: u8) -> IngestSource {
    IngestSource::new(id, Dataset::Omni, client, Arc::new(OmniDecoder::new(res)))
}

fn ae_source(id: &str, client: Arc<dyn SourceClient>) -> IngestSource {
    IngestSource::new(id, Dataset::Ae, client, Arc::new(IagaDecoder::ae()))
}

async fn seed_omni(store: &dyn RecordStore, count: u32) {
    for minute in 0..count {
        let key = NaturalKey {
            dataset: Dataset::Omni,
            time: Utc.with_ymd_and_hms(2001, 1, 1, 0, minute, 0).unwrap(),
            discriminator: Some("res=1".to_string()),
        };
        let doc: Document = json!({ "dataset": "Omni", "res": 1 })
            .as_object()
            .cloned()
            .unwrap();
        store.insert(&key, doc).await.unwrap();
    }
}

#[tokio::test]
async fn test_incremental_run_covers_last_and_current_year() {
    common::init_test_tracing();
    let client = Arc::new(
        ScriptedClient::new("dst")
            .year(2023, vec![dst_line(2023, 12, 31, 23, -5)])
            .year(2024, vec![dst_line(2024, 6, 1, 0, -8), dst_line(2024, 6, 1, 1, -9)]),
    );
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(vec![dst_source("dst", client.clone())], store.clone());

    let summary = orchestrator
        .run_with_context(mid_2024(SyncMode::Incremental))
        .await
        .unwrap();

    assert_eq!(client.calls(), vec![2023, 2024]);
    assert_eq!(summary.current_year, 2024);
    assert_eq!(summary.inserted(), 3);
    assert!(summary.cleared.is_empty());
    assert!(summary.all_succeeded());
    assert_eq!(store.count(Dataset::Dst).await.unwrap(), 3);
}

#[tokio::test]
async fn test_full_run_starts_at_each_sources_earliest_year() {
    common::init_test_tracing();
    let dst = Arc::new(ScriptedClient::new("dst"));
    let ae = Arc::new(ScriptedClient::new("ae"));
    let sources = vec![
        dst_source("dst", dst.clone()).with_earliest_year(2020),
        ae_source("ae", ae.clone()).with_earliest_year(2022),
    ];
    let orchestrator = Orchestrator::new(sources, Arc::new(MemoryStore::new()));

    let summary = orchestrator.run_with_context(mid_2024(SyncMode::Full)).await.unwrap();

    assert_eq!(dst.calls(), vec![2020, 2021, 2022, 2023, 2024]);
    assert_eq!(ae.calls(), vec![2022, 2023, 2024]);
    assert_eq!(summary.report("dst").unwrap().years_attempted.len(), 5);
    assert_eq!(summary.report("ae").unwrap().years_attempted.len(), 3);
}

#[tokio::test]
async fn test_failing_source_does_not_affect_siblings() {
    common::init_test_tracing();
    let healthy = Arc::new(
        ScriptedClient::new("dst")
            .year(2023, vec![dst_line(2023, 3, 1, 0, -20)])
            .year(2024, vec![dst_line(2024, 3, 1, 0, -30)]),
    );
    let broken = Arc::new(
        ScriptedClient::new("ae")
            .failing_year(2023, "503 Service Unavailable")
            .failing_year(2024, "503 Service Unavailable"),
    );
    let sources = vec![dst_source("dst", healthy), ae_source("ae", broken)];
    let orchestrator = Orchestrator::new(sources, Arc::new(MemoryStore::new()));

    let summary = orchestrator
        .run_with_context(mid_2024(SyncMode::Incremental))
        .await
        .unwrap();

    let dst = summary.report("dst").unwrap();
    assert!(dst.succeeded());
    assert_eq!(dst.inserted, 2);

    let ae = summary.report("ae").unwrap();
    assert!(ae.launched);
    assert_eq!(ae.failed_years, vec![2023, 2024]);
    assert_eq!(summary.failed_sources(), vec!["ae"]);
    assert!(!summary.all_succeeded());
}

#[tokio::test]
async fn test_panicking_job_becomes_a_launch_failure() {
    common::init_test_tracing();
    let healthy = Arc::new(ScriptedClient::new("dst").year(2024, vec![dst_line(2024, 1, 1, 0, -1)]));
    let sources = vec![
        ae_source("ae", Arc::new(PanickingClient)),
        dst_source("dst", healthy),
    ];
    let orchestrator = Orchestrator::new(sources, Arc::new(MemoryStore::new()));

    let summary = orchestrator
        .run_with_context(mid_2024(SyncMode::Incremental))
        .await
        .unwrap();

    // configuration order is kept
    let order: Vec<&str> = summary.reports.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(order, vec!["ae", "dst"]);

    let ae = summary.report("ae").unwrap();
    assert!(!ae.launched);
    assert!(matches!(&ae.issues[0], SyncIssue::Launch { .. }));
    assert_eq!(summary.report("dst").unwrap().inserted, 1);
}

#[tokio::test]
async fn test_full_run_clears_shared_collection_once() {
    common::init_test_tracing();
    let store = Arc::new(MemoryStore::new());
    seed_omni(store.as_ref(), 4).await;

    let dst_client = Arc::new(ScriptedClient::new("dst").year(2024, vec![dst_line(2024, 2, 2, 2, -2)]));
    let one = Arc::new(ScriptedClient::new("omni-1min"));
    let five = Arc::new(ScriptedClient::new("omni-5min"));
    let sources = vec![
        omni_source("omni-1min", one.clone(), 1).with_earliest_year(2024),
        omni_source("omni-5min", five.clone(), 5).with_earliest_year(2024),
        dst_source("dst", dst_client).with_earliest_year(2024),
    ];
    let orchestrator = Orchestrator::new(sources, store.clone());

    let summary = orchestrator.run_with_context(mid_2024(SyncMode::Full)).await.unwrap();

    assert_eq!(summary.cleared, vec![(Dataset::Omni, 4)]);
    assert_eq!(store.count(Dataset::Omni).await.unwrap(), 0);
    assert_eq!(store.count(Dataset::Dst).await.unwrap(), 1);
    assert_eq!(one.calls(), vec![2024]);
    assert_eq!(five.calls(), vec![2024]);
}

#[tokio::test]
async fn test_incremental_run_never_clears() {
    let store = Arc::new(MemoryStore::new());
    seed_omni(store.as_ref(), 2).await;
    let sources = vec![omni_source("omni-1min", Arc::new(ScriptedClient::new("omni-1min")), 1)];
    let orchestrator = Orchestrator::new(sources, store.clone());

    let summary = orchestrator
        .run_with_context(mid_2024(SyncMode::Incremental))
        .await
        .unwrap();

    assert!(summary.cleared.is_empty());
    assert_eq!(store.count(Dataset::Omni).await.unwrap(), 2);
}

#[tokio::test]
async fn test_failed_clear_blocks_only_that_dataset() {
    common::init_test_tracing();
    let store = Arc::new(FlakyStore::new().fail_clear_for(Dataset::Omni));
    let sources = vec![
        omni_source("omni-1min", Arc::new(ScriptedClient::new("omni-1min")), 1).with_earliest_year(2024),
        dst_source("dst", Arc::new(ScriptedClient::new("dst"))).with_earliest_year(2024),
    ];
    let orchestrator = Orchestrator::new(sources, store);

    let summary = orchestrator.run_with_context(mid_2024(SyncMode::Full)).await.unwrap();

    assert!(!summary.report("omni-1min").unwrap().launched);
    assert!(summary.report("dst").unwrap().succeeded());
}

#[tokio::test]
async fn test_no_sources_is_an_error() {
    let orchestrator = Orchestrator::new(Vec::new(), Arc::new(MemoryStore::new()));
    let err = orchestrator.run(SyncMode::Incremental).await.unwrap_err();
    assert!(matches!(err, IngestError::NoSources));
}

#[tokio::test]
async fn test_nothing_launched_is_an_error() {
    common::init_test_tracing();
    let store = Arc::new(FlakyStore::new().fail_index_for(Dataset::Dst));
    let sources = vec![
        dst_source("dst", Arc::new(ScriptedClient::new("dst"))),
        dst_source("dst-mirror", Arc::new(ScriptedClient::new("dst-mirror"))),
    ];
    let orchestrator = Orchestrator::new(sources, store);

    let err = orchestrator
        .run_with_context(mid_2024(SyncMode::Incremental))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::NoJobLaunched(2)));
}

#[tokio::test]
async fn test_sync_one_backfills_explicit_range() {
    common::init_test_tracing();
    let client = Arc::new(
        ScriptedClient::new("dst")
            .year(1990, vec![dst_line(1990, 5, 5, 5, -55)])
            .year(1991, vec![dst_line(1991, 5, 5, 5, -66)]),
    );
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(vec![dst_source("dst", client.clone())], store.clone());

    let report = orchestrator.sync_one("dst", 1990, 1991).await.unwrap();

    assert_eq!(client.calls(), vec![1990, 1991]);
    assert_eq!(report.inserted, 2);
    assert!(report.succeeded());
    assert!(store.indexes(Dataset::Dst).await.contains(&"dst".to_string()));
}

#[tokio::test]
async fn test_sync_one_rejects_unknown_source_and_inverted_range() {
    let client = Arc::new(ScriptedClient::new("dst"));
    let orchestrator = Orchestrator::new(vec![dst_source("dst", client.clone())], Arc::new(MemoryStore::new()));

    let err = orchestrator.sync_one("sym-h", 2000, 2001).await.unwrap_err();
    assert!(matches!(err, IngestError::UnknownSource(id) if id == "sym-h"));

    let err = orchestrator.sync_one("dst", 2005, 2001).await.unwrap_err();
    assert!(matches!(err, IngestError::InvalidYearRange { start: 2005, end: 2001 }));

    assert!(client.calls().is_empty());
}
