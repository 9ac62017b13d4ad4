//! End-to-end tests for the retrieval job.
//!
//! MockProvider → RetrieveJob → snapshot files on disk.

use importer_core::{days_by_month, entries_from_paths, Metric, Snapshot};
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_retrieve_writes_monthly_snapshots() {
    let ctx = TestContext::new("retrieve_monthly");
    ctx.provider.answer(
        Metric::Downloads,
        fixtures::day("2024-08-30"),
        vec![fixtures::download_row("3s45v-k5m55", "coffee.assess.bmi.gz", 5, 3)],
    );
    ctx.provider.answer(
        Metric::Views,
        fixtures::day("2024-09-02"),
        vec![
            fixtures::view_row("3s45v-k5m55", 7, 4),
            fixtures::view_row("t8k1h-p8435", 1, 1),
        ],
    );

    let months = days_by_month(fixtures::day("2024-08-30"), fixtures::day("2024-09-02")).unwrap();
    let paths = ctx
        .retrieve_job()
        .run(&months, &Metric::ALL)
        .await
        .expect("retrieval should succeed");

    assert_eq!(paths.len(), 4, "one snapshot per metric and month");
    assert_eq!(ctx.provider.call_count(), 8, "one request per metric and day");

    let downloads = Snapshot::read(&ctx.data_dir().join("downloads_2024_08.json")).unwrap();
    assert_eq!(
        downloads.days.keys().collect::<Vec<_>>(),
        vec!["2024-08-30", "2024-08-31"]
    );
    assert_eq!(downloads.entry_count(), 1);

    let entries: Vec<_> = entries_from_paths(&paths)
        .collect::<Result<_, _>>()
        .expect("snapshots should parse");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].file_key.as_deref(), Some("coffee.assess.bmi.gz"));
    assert_eq!(entries[1].record_id, "3s45v-k5m55");
    assert_eq!(entries[1].view_count, 7);
    assert_eq!(entries[1].unique_count, 4);
}

#[tokio::test]
async fn test_failed_day_is_recorded_empty() {
    let ctx = TestContext::new("retrieve_failed_day");
    let d1 = fixtures::day("2024-08-01");
    let d2 = fixtures::day("2024-08-02");
    ctx.provider
        .answer(Metric::Views, d1, vec![fixtures::view_row("abc12-def34", 1, 1)]);
    ctx.provider.fail(Metric::Views, d2);

    let months = days_by_month(d1, d2).unwrap();
    let paths = ctx
        .retrieve_job()
        .run(&months, &[Metric::Views])
        .await
        .expect("a failed day must not fail the run");

    let snapshot = Snapshot::read(&paths[0]).unwrap();
    assert_eq!(snapshot.days["2024-08-01"].len(), 1);
    assert!(snapshot.days["2024-08-02"].is_empty());
}

#[tokio::test]
async fn test_retrieve_then_ingest_round_trip() {
    let ctx = TestContext::new("retrieve_then_ingest");
    let d = fixtures::day("2024-08-30");
    ctx.provider.answer(
        Metric::Downloads,
        d,
        vec![fixtures::download_row("3s45v-k5m55", "coffee.assess.bmi.gz", 5, 3)],
    );
    ctx.provider
        .answer(Metric::Views, d, vec![fixtures::view_row("3s45v-k5m55", 2, 2)]);
    ctx.store.add_record("3s45v-k5m55", "by5n4-x1h80");
    ctx.store
        .add_file("3s45v-k5m55", "coffee.assess.bmi.gz", "F", "B", 9);

    let paths = ctx
        .retrieve_job()
        .run(&days_by_month(d, d).unwrap(), &Metric::ALL)
        .await
        .unwrap();
    let report = ctx.ingest(&paths).await.unwrap();

    assert_eq!(report.entries, 2);
    assert_eq!(report.stats.success, 2);
    let ids: Vec<String> = ctx.indexer.indexed().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["B_F-2024-08-30", "ui_3s45v-k5m55-2024-08-30"]);
}
