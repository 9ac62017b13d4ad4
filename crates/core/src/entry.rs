//! Analytics metrics and the intermediate entry parsed from raw provider data.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::days::parse_day;
use crate::error::{Error, Result};

/// Record id: first path segment after `records/`, ending at `/` or end of label.
static RECORD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)records/([^/]+)(?:/|$)").expect("valid regex"));

/// File key: everything after `/files/` up to the download query marker.
static FILE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/files/([^?]+)\?download=1").expect("valid regex"));

/// Analytics metric retrieved from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Downloads,
    Views,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Downloads, Metric::Views];

    /// Provider API method aggregating this metric.
    pub fn provider_method(&self) -> &'static str {
        match self {
            Self::Downloads => "Actions.getDownloads",
            Self::Views => "Actions.getPageUrls",
        }
    }

    /// Prefix of the snapshot file names holding this metric.
    pub fn snapshot_prefix(&self) -> &'static str {
        match self {
            Self::Downloads => "downloads",
            Self::Views => "views",
        }
    }

    /// Statistic kind used in index names.
    pub fn stat_kind(&self) -> &'static str {
        match self {
            Self::Downloads => "file-download",
            Self::Views => "record-view",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.snapshot_prefix())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "downloads" => Ok(Self::Downloads),
            "views" => Ok(Self::Views),
            other => Err(Error::config(format!("unknown metric: {other}"))),
        }
    }
}

/// The fields of a provider entry this importer reads.
///
/// Providers omit zero-valued metrics, so counts default to zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnalyticsEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub nb_visits: u64,
}

/// Intermediate representation of one provider entry for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEntry {
    pub metric: Metric,
    pub day: NaiveDate,
    pub record_id: String,
    /// Present for downloads only.
    pub file_key: Option<String>,
    /// Total hits.
    pub view_count: u64,
    /// Unique visits.
    pub unique_count: u64,
}

impl AnalyticsEntry {
    /// Parse a raw provider entry recorded on `day`.
    pub fn parse(metric: Metric, day: &str, raw: &serde_json::Value) -> Result<Self> {
        let day = parse_day(day)?;
        let raw: RawAnalyticsEntry = serde_json::from_value(raw.clone())?;
        Self::from_raw(metric, day, raw)
    }

    pub fn from_raw(metric: Metric, day: NaiveDate, raw: RawAnalyticsEntry) -> Result<Self> {
        let label = raw
            .label
            .ok_or_else(|| Error::malformed_label("", "entry has no label"))?;

        let record_id = parse_record_id(&label)?;
        let file_key = match metric {
            Metric::Downloads => Some(parse_file_key(&label)?),
            Metric::Views => None,
        };

        if raw.nb_visits > raw.nb_hits {
            return Err(Error::InvalidCounts(format!(
                "{label}: {} visits exceed {} hits",
                raw.nb_visits, raw.nb_hits
            )));
        }

        Ok(Self {
            metric,
            day,
            record_id,
            file_key,
            view_count: raw.nb_hits,
            unique_count: raw.nb_visits,
        })
    }
}

/// Extract the record id from `.../records/<id>[/...]`.
pub fn parse_record_id(label: &str) -> Result<String> {
    RECORD_ID
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::malformed_label(label, "no record id after records/"))
}

/// Extract the file key from `.../files/<key>?download=1`.
pub fn parse_file_key(label: &str) -> Result<String> {
    FILE_KEY
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::malformed_label(label, "no file key before ?download=1"))
}
