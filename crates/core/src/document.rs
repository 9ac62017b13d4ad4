//! Statistics documents in the shape emitted by the live event pipeline.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::days::{format_day, YearMonth};
use crate::entry::{AnalyticsEntry, Metric};
use crate::error::{Error, Result};

/// Read-only lookups from external identifiers to storage identifiers.
pub trait Resolution {
    fn file_id_for(&self, record_id: &str, file_key: &str) -> Result<&str>;
    fn bucket_id_for(&self, record_id: &str) -> Result<&str>;
    fn parent_id_for(&self, record_id: &str) -> Result<&str>;
    fn size_for(&self, file_id: &str) -> Result<u64>;
}

/// Source of the `updated_timestamp` field.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `_source` of a `file-download` statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDownloadSource {
    pub timestamp: String,
    pub unique_id: String,
    pub count: u64,
    pub updated_timestamp: String,
    pub unique_count: u64,
    pub volume: u64,
    pub file_id: String,
    pub file_key: String,
    pub bucket_id: String,
    pub recid: String,
    pub parent_recid: String,
}

/// `_source` of a `record-view` statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordViewSource {
    pub timestamp: String,
    pub unique_id: String,
    pub count: u64,
    pub updated_timestamp: String,
    pub unique_count: u64,
    pub recid: String,
    pub parent_recid: String,
    pub via_api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatisticsSource {
    Download(FileDownloadSource),
    View(RecordViewSource),
}

/// One statistic for one (record, file or none, day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsDocument {
    pub id: String,
    pub index: String,
    pub source: StatisticsSource,
}

/// Index name for a statistic kind and month, e.g. `stats-file-download-2024-08`.
pub fn index_name(prefix: &str, metric: Metric, month: YearMonth) -> String {
    format!(
        "{prefix}stats-{}-{:04}-{:02}",
        metric.stat_kind(),
        month.year,
        month.month
    )
}

/// Synthetic entries carry no time of day, so they sit at midnight.
fn day_start(day: NaiveDate) -> String {
    format!("{}T00:00:00", format_day(day))
}

/// Builds statistics documents from analytics entries.
pub struct DocumentBuilder<'a, R: Resolution + ?Sized> {
    resolution: &'a R,
    clock: &'a dyn Clock,
    index_prefix: String,
}

impl<'a, R: Resolution + ?Sized> DocumentBuilder<'a, R> {
    pub fn new(resolution: &'a R, clock: &'a dyn Clock) -> Self {
        Self {
            resolution,
            clock,
            index_prefix: String::new(),
        }
    }

    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    /// Build the document for one entry.
    pub fn build(&self, entry: &AnalyticsEntry) -> Result<StatisticsDocument> {
        match entry.metric {
            Metric::Downloads => self.build_download(entry),
            Metric::Views => self.build_view(entry),
        }
    }

    fn updated_timestamp(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    fn build_download(&self, entry: &AnalyticsEntry) -> Result<StatisticsDocument> {
        let file_key = entry.file_key.as_deref().ok_or_else(|| {
            Error::malformed_label(&entry.record_id, "download entry without file key")
        })?;

        let file_id = self.resolution.file_id_for(&entry.record_id, file_key)?;
        let bucket_id = self.resolution.bucket_id_for(&entry.record_id)?;
        let parent_recid = self.resolution.parent_id_for(&entry.record_id)?;
        let size = self.resolution.size_for(file_id)?;

        let volume = entry.view_count.checked_mul(size).ok_or_else(|| {
            Error::InvalidCounts(format!(
                "volume overflow: {} downloads of {size} bytes",
                entry.view_count
            ))
        })?;

        let unique_id = format!("{bucket_id}_{file_id}");

        Ok(StatisticsDocument {
            id: format!("{unique_id}-{}", format_day(entry.day)),
            index: index_name(&self.index_prefix, entry.metric, YearMonth::of(entry.day)),
            source: StatisticsSource::Download(FileDownloadSource {
                timestamp: day_start(entry.day),
                unique_id,
                count: entry.view_count,
                updated_timestamp: self.updated_timestamp(),
                unique_count: entry.unique_count,
                volume,
                file_id: file_id.to_string(),
                file_key: file_key.to_string(),
                bucket_id: bucket_id.to_string(),
                recid: entry.record_id.clone(),
                parent_recid: parent_recid.to_string(),
            }),
        })
    }

    fn build_view(&self, entry: &AnalyticsEntry) -> Result<StatisticsDocument> {
        let parent_recid = self.resolution.parent_id_for(&entry.record_id)?;
        let unique_id = format!("ui_{}", entry.record_id);

        Ok(StatisticsDocument {
            id: format!("{unique_id}-{}", format_day(entry.day)),
            index: index_name(&self.index_prefix, entry.metric, YearMonth::of(entry.day)),
            source: StatisticsSource::View(RecordViewSource {
                timestamp: day_start(entry.day),
                unique_id,
                count: entry.view_count,
                updated_timestamp: self.updated_timestamp(),
                unique_count: entry.unique_count,
                recid: entry.record_id.clone(),
                parent_recid: parent_recid.to_string(),
                // Backfilled views cannot tell API access apart.
                via_api: false,
            }),
        })
    }
}
