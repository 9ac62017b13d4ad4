//! Common test setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use importer_core::{FixedClock, Result};
use worker::{IngestConfig, IngestJob, IngestReport, RetrieveJob};

use crate::fixtures::scratch_dir;
use crate::mocks::{MockIndexer, MockProvider, MockRecordStore};

/// Mocked provider, record store and search cluster around a scratch
/// snapshot directory.
///
/// The jobs are the production ones; only their backends are replaced.
pub struct TestContext {
    pub data_dir: PathBuf,
    pub provider: MockProvider,
    pub store: MockRecordStore,
    pub indexer: MockIndexer,
}

impl TestContext {
    pub fn new(name: &str) -> Self {
        Self {
            data_dir: scratch_dir(name),
            provider: MockProvider::new(),
            store: MockRecordStore::new(),
            indexer: MockIndexer::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn retrieve_job(&self) -> RetrieveJob {
        RetrieveJob::new(Arc::new(self.provider.clone()), self.data_dir.clone())
    }

    /// Ingest job whose documents are stamped 2025-09-23T00:00:00+00:00.
    pub fn ingest_job(&self, batch_size: usize) -> IngestJob {
        IngestJob::new(
            Arc::new(self.store.clone()),
            Arc::new(self.indexer.clone()),
            IngestConfig {
                batch_size,
                ..IngestConfig::default()
            },
        )
        .with_clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2025, 9, 23, 0, 0, 0).unwrap(),
        )))
    }

    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        self.ingest_job(50).run(paths).await
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.data_dir).ok();
    }
}
