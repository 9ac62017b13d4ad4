//! Calendar helpers: days and the year-month partitions they fall into.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Day format used by the provider, snapshots, and document ids.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(day: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(day, DAY_FORMAT).map_err(|e| Error::InvalidDay(format!("{day}: {e}")))
}

/// Format a day as `YYYY-MM-DD`.
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// A calendar month, the unit of snapshot files and index partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidDay(format!("month out of range: {year}-{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Expand the inclusive range `from..=to` into days grouped by month.
pub fn days_by_month(from: NaiveDate, to: NaiveDate) -> Result<BTreeMap<YearMonth, Vec<NaiveDate>>> {
    if from > to {
        return Err(Error::config(format!(
            "start day {} is after end day {}",
            format_day(from),
            format_day(to)
        )));
    }

    let mut months: BTreeMap<YearMonth, Vec<NaiveDate>> = BTreeMap::new();
    for day in from.iter_days().take_while(|d| *d <= to) {
        months.entry(YearMonth::of(day)).or_default().push(day);
    }
    Ok(months)
}
