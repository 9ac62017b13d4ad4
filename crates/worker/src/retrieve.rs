//! Retrieval job: provider aggregates to snapshot files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use importer_core::{Metric, Result, YearMonth};
use matomo::{retrieve_month, AnalyticsProvider};
use tracing::info;

/// Fetches whole months from an [`AnalyticsProvider`] and writes one snapshot
/// per (metric, month).
pub struct RetrieveJob {
    provider: Arc<dyn AnalyticsProvider>,
    output_dir: PathBuf,
}

impl RetrieveJob {
    pub fn new(provider: Arc<dyn AnalyticsProvider>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_dir: output_dir.into(),
        }
    }

    /// Retrieve every month of `months` for each of `metrics`.
    ///
    /// Months are processed one after the other; the days of a month are
    /// fetched concurrently. Returns the written snapshot paths in order.
    pub async fn run(
        &self,
        months: &BTreeMap<YearMonth, Vec<NaiveDate>>,
        metrics: &[Metric],
    ) -> Result<Vec<PathBuf>> {
        info!(
            months = months.len(),
            metrics = ?metrics,
            output_dir = %self.output_dir.display(),
            "Starting retrieval"
        );

        let mut written = Vec::with_capacity(months.len() * metrics.len());
        for (&month, days) in months {
            for &metric in metrics {
                let path =
                    retrieve_month(&*self.provider, metric, month, days, &self.output_dir).await?;
                written.push(path);
            }
        }

        info!(snapshots = written.len(), "Retrieval finished");
        Ok(written)
    }
}
