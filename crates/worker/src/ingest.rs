//! Ingestion job: snapshot files to the statistics indices.
//!
//! Runs in two passes over the snapshots. The first collects the working set
//! and builds the [`ResolutionCache`]; the second turns entries into
//! documents lazily and feeds them to the bulk ingestor. Only one month of
//! raw entries is held in memory at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use importer_core::{entries_from_paths, Clock, DocumentBuilder, Result, SystemClock};
use resolver::{RecordStore, ResolutionCache, WorkingSet};
use search_client::{BulkIndexer, BulkIngestor, BulkStats};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::info;

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Documents per bulk request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Prepended to every target index name.
    #[serde(default)]
    pub index_prefix: String,
}

fn default_batch_size() -> usize {
    50
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            index_prefix: String::new(),
        }
    }
}

/// Result of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Analytics entries read from the snapshots.
    pub entries: usize,
    pub stats: BulkStats,
}

pub struct IngestJob {
    store: Arc<dyn RecordStore>,
    indexer: Arc<dyn BulkIndexer>,
    config: IngestConfig,
    clock: Arc<dyn Clock>,
}

impl IngestJob {
    pub fn new(
        store: Arc<dyn RecordStore>,
        indexer: Arc<dyn BulkIndexer>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            indexer,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock stamping `updated_timestamp`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let start = Instant::now();
        // Checked before any lookup so a bad batch size fails fast.
        let ingestor = BulkIngestor::new(&*self.indexer, self.config.batch_size)?;

        info!(files = paths.len(), "Collecting working set");
        let (working_set, entries) = WorkingSet::collect(entries_from_paths(paths))?;
        info!(
            entries,
            records = working_set.record_count(),
            files = working_set.file_count(),
            "Working set collected"
        );

        if working_set.is_empty() {
            info!("No analytics entries to ingest");
            return Ok(IngestReport::default());
        }

        let cache = ResolutionCache::build(&*self.store, &working_set).await?;
        drop(working_set);

        let builder = DocumentBuilder::new(&cache, &*self.clock)
            .with_index_prefix(self.config.index_prefix.clone());

        let documents = entries_from_paths(paths).map(|entry| {
            let entry = entry?;
            metrics().entries_converted.inc();
            let document = builder.build(&entry)?;
            metrics().documents_built.inc();
            Ok(document)
        });
        let stats = ingestor.ingest(documents).await?;

        info!(
            entries,
            indexed = stats.success,
            failed = stats.failed,
            batches = stats.batches,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingestion finished"
        );
        Ok(IngestReport { entries, stats })
    }
}
