//! Test fixtures: provider rows and scratch directories.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use importer_core::parse_day;
use serde_json::{json, Value};

/// Provider row for a file download.
pub fn download_row(record_id: &str, file_key: &str, hits: u64, visits: u64) -> Value {
    json!({
        "label": format!("repo.example.org/records/{record_id}/files/{file_key}?download=1"),
        "nb_hits": hits,
        "nb_visits": visits,
        "sum_time_spent": 0
    })
}

/// Provider row for a record landing page view.
pub fn view_row(record_id: &str, hits: u64, visits: u64) -> Value {
    json!({
        "label": format!("repo.example.org/records/{record_id}"),
        "nb_hits": hits,
        "nb_visits": visits,
        "sum_time_spent": 12
    })
}

pub fn day(value: &str) -> NaiveDate {
    parse_day(value).unwrap()
}

/// Fresh directory under the system temp dir, unique per call.
pub fn scratch_dir(name: &str) -> PathBuf {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = SEQ.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "importer_it_{name}_{}_{nanos}_{seq}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
