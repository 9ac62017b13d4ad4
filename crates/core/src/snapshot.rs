//! Snapshot files: the hand-off between retrieval and ingestion.
//!
//! One file per (metric, month), named `<prefix>_<YYYY>_<MM>.json`, holding a
//! JSON object that maps each day to the raw provider entries of that day.
//! An empty array means the day was fetched and had no activity.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::days::{format_day, YearMonth};
use crate::entry::{AnalyticsEntry, Metric};
use crate::error::{Error, Result};

/// Raw provider entries of one metric for one month, keyed by day.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metric: Metric,
    pub month: YearMonth,
    pub days: BTreeMap<String, Vec<Value>>,
}

impl Snapshot {
    pub fn new(metric: Metric, month: YearMonth) -> Self {
        Self {
            metric,
            month,
            days: BTreeMap::new(),
        }
    }

    /// Record the entries fetched for `day`.
    pub fn insert_day(&mut self, day: chrono::NaiveDate, entries: Vec<Value>) {
        self.days.insert(format_day(day), entries);
    }

    pub fn entry_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn file_name(metric: Metric, month: YearMonth) -> String {
        format!(
            "{}_{:04}_{:02}.json",
            metric.snapshot_prefix(),
            month.year,
            month.month
        )
    }

    /// Recover metric and month from a snapshot file name.
    ///
    /// Accepts `_` or `-` between year and month.
    pub fn parse_file_name(path: &Path) -> Result<(Metric, YearMonth)> {
        let invalid = || Error::snapshot(format!("unrecognised snapshot name: {}", path.display()));

        let stem = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".json"))
            .ok_or_else(invalid)?;
        let (prefix, rest) = stem.split_once('_').ok_or_else(invalid)?;
        let (year, month) = rest
            .split_once('_')
            .or_else(|| rest.split_once('-'))
            .ok_or_else(invalid)?;

        let metric = prefix.parse::<Metric>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Ok((metric, YearMonth::new(year, month)?))
    }

    /// Write the snapshot into `dir`, replacing any previous file atomically.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(self.metric, self.month));
        let tmp = path.with_extension("json.tmp");

        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &self.days)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(
            path = %path.display(),
            days = self.days.len(),
            entries = self.entry_count(),
            "Wrote snapshot"
        );
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let (metric, month) = Self::parse_file_name(path)?;
        let reader = BufReader::new(fs::File::open(path)?);
        let days: BTreeMap<String, Vec<Value>> = serde_json::from_reader(reader)
            .map_err(|e| Error::snapshot(format!("{}: {e}", path.display())))?;

        Ok(Self { metric, month, days })
    }

    /// Parse every raw entry, in day order.
    pub fn entries(&self) -> impl Iterator<Item = Result<AnalyticsEntry>> + '_ {
        self.days.iter().flat_map(move |(day, raws)| {
            raws.iter().map(move |raw| {
                let entry = AnalyticsEntry::parse(self.metric, day, raw)?;
                if YearMonth::of(entry.day) != self.month {
                    return Err(Error::snapshot(format!(
                        "day {day} does not belong to {} snapshot of {}",
                        self.metric, self.month
                    )));
                }
                Ok(entry)
            })
        })
    }
}

/// Lazily parsed entries of several snapshot files.
///
/// Files are opened one at a time, so at most one month is held in memory.
pub struct SnapshotEntries {
    paths: std::vec::IntoIter<PathBuf>,
    current: std::vec::IntoIter<Result<AnalyticsEntry>>,
}

impl Iterator for SnapshotEntries {
    type Item = Result<AnalyticsEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }

            let path = self.paths.next()?;
            match Snapshot::read(&path) {
                Ok(snapshot) => {
                    self.current = snapshot.entries().collect::<Vec<_>>().into_iter();
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub fn entries_from_paths(paths: &[PathBuf]) -> SnapshotEntries {
    SnapshotEntries {
        paths: paths.to_vec().into_iter(),
        current: Vec::new().into_iter(),
    }
}
