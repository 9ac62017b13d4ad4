//! The record-store resolution interface.

use async_trait::async_trait;
use importer_core::Result;
use serde::{Deserialize, Serialize};

/// Grouping information of a record.
///
/// Carries no bucket id. The bucket of a record is taken from its resolved
/// files, so a record referenced only by views has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    /// Identifier shared by all versions of the record.
    pub parent_id: String,
}

/// Storage identity of one file of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub bucket_id: String,
    pub size: u64,
}

/// Read access to the repository's records and files.
///
/// `record` answers the parent id; `file` answers the storage id, bucket id
/// and size. Callers needing a record's bucket resolve one of its files.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn record(&self, record_id: &str) -> Result<RecordInfo>;

    async fn file(&self, record_id: &str, file_key: &str) -> Result<FileInfo>;
}
