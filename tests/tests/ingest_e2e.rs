//! End-to-end tests for the ingestion job.
//!
//! Snapshot files → IngestJob → MockRecordStore lookups → MockIndexer.
//! The documents checked here are exactly what would be sent to `_bulk`.

use std::path::PathBuf;

use importer_core::{Metric, Snapshot, StatisticsSource, YearMonth};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

fn write_snapshot(ctx: &TestContext, metric: Metric, days: Value) -> PathBuf {
    let mut snapshot = Snapshot::new(metric, YearMonth::new(2024, 8).unwrap());
    snapshot.days = serde_json::from_value(days).unwrap();
    snapshot.write(ctx.data_dir()).unwrap()
}

/// The download from the worked example: 5 hits, 3 visits, 9 byte file.
#[tokio::test]
async fn test_download_document_e2e() {
    let ctx = TestContext::new("ingest_download");
    ctx.store.add_record("3s45v-k5m55", "by5n4-x1h80");
    ctx.store
        .add_file("3s45v-k5m55", "coffee.assess.bmi.gz", "F", "B", 9);

    let path = write_snapshot(
        &ctx,
        Metric::Downloads,
        json!({
            "2024-08-30": [
                fixtures::download_row("3s45v-k5m55", "coffee.assess.bmi.gz", 5, 3)
            ]
        }),
    );

    let report = ctx.ingest(&[path]).await.expect("ingestion should succeed");
    assert_eq!(report.entries, 1);
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.failed, 0);

    let indexed = ctx.indexer.indexed();
    assert_eq!(indexed.len(), 1);
    let doc = &indexed[0];
    assert_eq!(doc.id, "B_F-2024-08-30");
    assert_eq!(doc.index, "stats-file-download-2024-08");

    let StatisticsSource::Download(ref source) = doc.source else {
        panic!("expected a download document, got {:?}", doc.source);
    };
    assert_eq!(source.count, 5);
    assert_eq!(source.unique_count, 3);
    assert_eq!(source.volume, 45);
    assert_eq!(source.unique_id, "B_F");
    assert_eq!(source.timestamp, "2024-08-30T00:00:00");
    assert_eq!(source.updated_timestamp, "2025-09-23T00:00:00+00:00");
    assert_eq!(source.parent_recid, "by5n4-x1h80");

    let wire = serde_json::to_value(&doc.source).unwrap();
    assert_eq!(
        wire,
        json!({
            "timestamp": "2024-08-30T00:00:00",
            "unique_id": "B_F",
            "count": 5,
            "updated_timestamp": "2025-09-23T00:00:00+00:00",
            "unique_count": 3,
            "volume": 45,
            "file_id": "F",
            "file_key": "coffee.assess.bmi.gz",
            "bucket_id": "B",
            "recid": "3s45v-k5m55",
            "parent_recid": "by5n4-x1h80"
        })
    );
}

#[tokio::test]
async fn test_view_documents_e2e() {
    let ctx = TestContext::new("ingest_views");
    ctx.store.add_record("0c8rx-zsn76", "tb2gj-axd97");

    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({
            "2024-08-01": [ fixtures::view_row("0c8rx-zsn76", 3, 2) ],
            "2024-08-02": [],
            "2024-08-03": [ fixtures::view_row("0c8rx-zsn76", 1, 1) ]
        }),
    );

    let report = ctx.ingest(&[path]).await.unwrap();
    assert_eq!(report.entries, 2);

    let indexed = ctx.indexer.indexed();
    let ids: Vec<&str> = indexed.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["ui_0c8rx-zsn76-2024-08-01", "ui_0c8rx-zsn76-2024-08-03"]);
    assert!(indexed.iter().all(|d| d.index == "stats-record-view-2024-08"));

    let wire = serde_json::to_value(&indexed[0].source).unwrap();
    assert_eq!(wire["via_api"], false);
    assert_eq!(wire["unique_id"], "ui_0c8rx-zsn76");
    assert_eq!(wire["parent_recid"], "tb2gj-axd97");
    assert!(wire.get("volume").is_none());
}

#[tokio::test]
async fn test_one_lookup_per_distinct_record_and_file() {
    let ctx = TestContext::new("ingest_lookups");
    ctx.store.add_record("A", "PA");
    ctx.store.add_record("B", "PB");
    ctx.store.add_file("A", "f1", "A-f1", "BA", 10);
    ctx.store.add_file("B", "f2", "B-f2", "BB", 20);

    let mut downloads = serde_json::Map::new();
    let mut views = serde_json::Map::new();
    for day in 1..=31 {
        let key = format!("2024-08-{day:02}");
        downloads.insert(
            key.clone(),
            json!([
                fixtures::download_row("A", "f1", 1, 1),
                fixtures::download_row("B", "f2", 2, 1)
            ]),
        );
        views.insert(key, json!([fixtures::view_row("A", 4, 3)]));
    }
    let paths = vec![
        write_snapshot(&ctx, Metric::Downloads, Value::Object(downloads)),
        write_snapshot(&ctx, Metric::Views, Value::Object(views)),
    ];

    let report = ctx.ingest_job(25).run(&paths).await.unwrap();

    assert_eq!(report.entries, 93);
    assert_eq!(report.stats.success, 93);
    assert_eq!(report.stats.batches, 4);
    assert_eq!(ctx.store.total_lookups(), 4);
    assert!(ctx.store.lookups().values().all(|&n| n == 1));

    let sizes: Vec<usize> = ctx.indexer.batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![25, 25, 25, 18]);
}

#[tokio::test]
async fn test_reingest_produces_identical_ids() {
    let ctx = TestContext::new("ingest_idempotent");
    ctx.store.add_record("abc12-def34", "zzz99-yyy88");

    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({ "2024-08-15": [ fixtures::view_row("abc12-def34", 2, 1) ] }),
    );

    ctx.ingest(&[path.clone()]).await.unwrap();
    ctx.ingest(&[path]).await.unwrap();

    let batches = ctx.indexer.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
}

#[tokio::test]
async fn test_rejected_documents_are_counted() {
    let ctx = TestContext::new("ingest_rejections");
    ctx.store.add_record("r1", "p1");
    ctx.store.add_record("r2", "p2");
    ctx.indexer.reject("ui_r2-2024-08-05");

    let path = write_snapshot(
        &ctx,
        Metric::Views,
        json!({
            "2024-08-05": [ fixtures::view_row("r1", 1, 1), fixtures::view_row("r2", 1, 1) ]
        }),
    );

    let report = ctx.ingest(&[path]).await.expect("rejections must not fail the run");

    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(ctx.indexer.indexed().len(), 1);
}
