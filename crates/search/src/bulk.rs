//! Batched, statistics-only ingestion.

use std::time::Instant;

use importer_core::{Error, Result, StatisticsDocument};
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::client::BulkIndexer;

/// Aggregate counts of an ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkStats {
    pub success: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Streams documents to a [`BulkIndexer`] in fixed-size batches.
///
/// Batches are sent one at a time, in input order. Rejected documents are
/// counted, never raised.
pub struct BulkIngestor<'a, I: BulkIndexer + ?Sized> {
    indexer: &'a I,
    batch_size: usize,
}

impl<'a, I: BulkIndexer + ?Sized> BulkIngestor<'a, I> {
    pub fn new(indexer: &'a I, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config("bulk batch size must be at least 1"));
        }
        Ok(Self { indexer, batch_size })
    }

    /// Consume `documents` once, sending a batch whenever one fills up.
    ///
    /// An `Err` item (a document that could not be built) stops ingestion
    /// and is returned; batches already sent stay indexed.
    pub async fn ingest<D>(&self, documents: D) -> Result<BulkStats>
    where
        D: IntoIterator<Item = Result<StatisticsDocument>>,
    {
        let mut stats = BulkStats::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        for doc in documents {
            batch.push(doc?);
            if batch.len() >= self.batch_size {
                self.send(&batch, &mut stats).await?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            self.send(&batch, &mut stats).await?;
        }

        info!(
            success = stats.success,
            failed = stats.failed,
            batches = stats.batches,
            "Bulk ingestion finished"
        );
        Ok(stats)
    }

    async fn send(&self, batch: &[StatisticsDocument], stats: &mut BulkStats) -> Result<()> {
        let start = Instant::now();
        let outcome = self.indexer.bulk(batch).await?;
        metrics()
            .bulk_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        stats.batches += 1;
        stats.success += outcome.success;
        stats.failed += outcome.failed;

        metrics().bulk_batches.inc();
        metrics().documents_indexed.inc_by(outcome.success as u64);
        metrics().documents_failed.inc_by(outcome.failed as u64);

        if outcome.failed > 0 {
            warn!(
                batch = stats.batches,
                failed = outcome.failed,
                samples = ?outcome.error_samples,
                "Documents rejected by backend"
            );
        } else {
            debug!(batch = stats.batches, sent = batch.len(), "Batch indexed");
        }
        Ok(())
    }
}
