//! Batch retrieval of per-day analytics and monthly snapshots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use futures::future::join_all;
use importer_core::{Metric, Result, Snapshot, YearMonth};
use serde_json::Value;
use telemetry::metrics;
use tracing::{info, warn};

use crate::client::{AnalyticsProvider, DayFetch};

/// Fetch `metric` for every day concurrently.
///
/// All requests run on the current task and are joined before returning.
/// A failed day maps to an empty list, so the result always has one key
/// per requested day.
pub async fn fetch_many<P>(
    provider: &P,
    metric: Metric,
    days: &[NaiveDate],
) -> BTreeMap<NaiveDate, Vec<Value>>
where
    P: AnalyticsProvider + ?Sized,
{
    let fetches = days.iter().map(|&day| async move {
        let fetch = provider.fetch(metric, day).await;
        (day, fetch)
    });

    let mut per_day = BTreeMap::new();
    for (day, fetch) in join_all(fetches).await {
        if let DayFetch::Failed(ref reason) = fetch {
            metrics().provider_failures.inc();
            warn!(metric = %metric, day = %day, reason = %reason, "Day recorded as empty after failure");
        }

        let entries = fetch.into_entries();
        if entries.is_empty() {
            metrics().provider_empty_days.inc();
        }
        metrics().raw_entries_fetched.inc_by(entries.len() as u64);
        per_day.insert(day, entries);
    }
    per_day
}

/// Fetch one month of `metric` and persist it as a snapshot in `output_dir`.
pub async fn retrieve_month<P>(
    provider: &P,
    metric: Metric,
    month: YearMonth,
    days: &[NaiveDate],
    output_dir: &Path,
) -> Result<PathBuf>
where
    P: AnalyticsProvider + ?Sized,
{
    let mut snapshot = Snapshot::new(metric, month);
    for (day, entries) in fetch_many(provider, metric, days).await {
        snapshot.insert_day(day, entries);
    }

    let path = snapshot.write(output_dir)?;
    metrics().snapshots_written.inc();

    info!(
        metric = %metric,
        month = %month,
        days = snapshot.days.len(),
        entries = snapshot.entry_count(),
        path = %path.display(),
        "Wrote monthly snapshot"
    );
    Ok(path)
}
