//! Failure scenarios of the ingestion job.
//!
//! Everything except per-document rejections stops the run.

use std::path::PathBuf;

use importer_core::{Error, ErrorCategory, Metric, Snapshot, YearMonth};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

fn write_snapshot(ctx: &TestContext, metric: Metric, days: Value) -> PathBuf {
    let mut snapshot = Snapshot::new(metric, YearMonth::new(2024, 8).unwrap());
    snapshot.days = serde_json::from_value(days).unwrap();
    snapshot.write(ctx.data_dir()).unwrap()
}

#[tokio::test]
async fn test_unknown_record_aborts_before_indexing() {
    let ctx = TestContext::new("errors_unknown_record");
    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({ "2024-08-01": [ fixtures::view_row("gone1-gone2", 1, 1) ] }),
    );

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::RecordStore(_)), "got {err:?}");
    assert_eq!(err.category(), ErrorCategory::Backend);
    assert!(ctx.indexer.batches().is_empty());
}

#[tokio::test]
async fn test_unknown_file_aborts_before_indexing() {
    let ctx = TestContext::new("errors_unknown_file");
    ctx.store.add_record("abc12-def34", "p");
    let path = write_snapshot(
        &ctx,
        Metric::Downloads,
        json!({ "2024-08-01": [ fixtures::download_row("abc12-def34", "deleted.csv", 1, 1) ] }),
    );

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::RecordStore(_)), "got {err:?}");
    assert!(ctx.indexer.batches().is_empty());
}

#[tokio::test]
async fn test_malformed_label_fails_fast() {
    let ctx = TestContext::new("errors_malformed_label");
    ctx.store.add_record("abc12-def34", "p");
    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({
            "2024-08-01": [
                fixtures::view_row("abc12-def34", 1, 1),
                { "label": "repo.example.org/search?q=coffee", "nb_hits": 1, "nb_visits": 1 }
            ]
        }),
    );

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::MalformedLabel { .. }), "got {err:?}");
    assert_eq!(ctx.store.total_lookups(), 0);
    assert!(ctx.indexer.batches().is_empty());
}

#[tokio::test]
async fn test_unique_count_above_count_is_rejected() {
    let ctx = TestContext::new("errors_counts");
    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({ "2024-08-01": [ fixtures::view_row("abc12-def34", 1, 4) ] }),
    );

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::InvalidCounts(_)), "got {err:?}");
}

#[tokio::test]
async fn test_cluster_failure_is_fatal() {
    let ctx = TestContext::new("errors_cluster");
    ctx.store.add_record("abc12-def34", "p");
    ctx.indexer.set_should_fail(true);
    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({ "2024-08-01": [ fixtures::view_row("abc12-def34", 1, 1) ] }),
    );

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::Index(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreadable_snapshot_is_error() {
    let ctx = TestContext::new("errors_snapshot");
    let path = ctx.data_dir().join("views_2024_08.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ctx.ingest(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::Snapshot(_)), "got {err:?}");
}

#[tokio::test]
async fn test_zero_batch_size_is_config_error() {
    let ctx = TestContext::new("errors_batch_size");
    let path = write_snapshot(&ctx, Metric::Views, json!({ "2024-08-01": [] }));

    let err = ctx.ingest_job(0).run(&[path]).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}
