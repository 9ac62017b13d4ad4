//! Resolution cache.
//!
//! Built in two phases: collect the [`WorkingSet`] of a run, then resolve it
//! against a [`RecordStore`] with one query per distinct record and one per
//! distinct file. Afterwards the cache is read-only and a miss is an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use importer_core::{AnalyticsEntry, Error, Resolution, Result};
use tracing::{debug, info};

use crate::store::RecordStore;

/// Distinct records and (record, file key) pairs referenced by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    records: BTreeSet<String>,
    files: BTreeMap<String, BTreeSet<String>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: &AnalyticsEntry) {
        self.records.insert(entry.record_id.clone());
        if let Some(ref key) = entry.file_key {
            self.files
                .entry(entry.record_id.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    /// Collect the working set of a stream of entries.
    ///
    /// Stops at the first entry that failed to parse.
    pub fn collect<I>(entries: I) -> Result<(Self, usize)>
    where
        I: IntoIterator<Item = Result<AnalyticsEntry>>,
    {
        let mut set = Self::new();
        let mut count = 0;
        for entry in entries {
            set.add(&entry?);
            count += 1;
        }
        Ok((set, count))
    }

    pub fn records(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .flat_map(|(record, keys)| keys.iter().map(move |key| (record.as_str(), key.as_str())))
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Frozen lookups from external identifiers to storage identifiers.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    buckets: HashMap<String, String>,
    parents: HashMap<String, String>,
    file_ids: HashMap<String, HashMap<String, String>>,
    sizes: HashMap<String, u64>,
}

impl ResolutionCache {
    /// Resolve every record and file of `working_set` against `store`.
    ///
    /// Any store failure aborts construction.
    pub async fn build<S>(store: &S, working_set: &WorkingSet) -> Result<Self>
    where
        S: RecordStore + ?Sized,
    {
        info!(
            records = working_set.record_count(),
            files = working_set.file_count(),
            "Building resolution cache"
        );

        let mut cache = Self::default();

        for record_id in working_set.records() {
            let record = store.record(record_id).await?;
            debug!(record_id, parent_id = %record.parent_id, "Resolved record");
            cache.parents.insert(record_id.to_string(), record.parent_id);
        }

        for (record_id, file_key) in working_set.files() {
            let file = store.file(record_id, file_key).await?;
            debug!(record_id, file_key, file_id = %file.file_id, "Resolved file");

            match cache.buckets.get(record_id) {
                Some(bucket_id) if *bucket_id != file.bucket_id => {
                    return Err(Error::record_store(format!(
                        "record {record_id} has files in buckets {bucket_id} and {}",
                        file.bucket_id
                    )));
                }
                Some(_) => {}
                None => {
                    cache
                        .buckets
                        .insert(record_id.to_string(), file.bucket_id.clone());
                }
            }

            cache.sizes.insert(file.file_id.clone(), file.size);
            cache
                .file_ids
                .entry(record_id.to_string())
                .or_default()
                .insert(file_key.to_string(), file.file_id);
        }

        info!(
            records = cache.parents.len(),
            files = cache.sizes.len(),
            "Resolution cache ready"
        );
        Ok(cache)
    }

    pub fn record_count(&self) -> usize {
        self.parents.len()
    }

    pub fn file_count(&self) -> usize {
        self.file_ids.values().map(HashMap::len).sum()
    }
}

impl Resolution for ResolutionCache {
    fn file_id_for(&self, record_id: &str, file_key: &str) -> Result<&str> {
        self.file_ids
            .get(record_id)
            .and_then(|keys| keys.get(file_key))
            .map(String::as_str)
            .ok_or_else(|| Error::cache_miss(format!("file {file_key:?} of record {record_id}")))
    }

    fn bucket_id_for(&self, record_id: &str) -> Result<&str> {
        self.buckets
            .get(record_id)
            .map(String::as_str)
            .ok_or_else(|| Error::cache_miss(format!("bucket of record {record_id}")))
    }

    fn parent_id_for(&self, record_id: &str) -> Result<&str> {
        self.parents
            .get(record_id)
            .map(String::as_str)
            .ok_or_else(|| Error::cache_miss(format!("parent of record {record_id}")))
    }

    fn size_for(&self, file_id: &str) -> Result<u64> {
        self.sizes
            .get(file_id)
            .copied()
            .ok_or_else(|| Error::cache_miss(format!("size of file {file_id}")))
    }
}
