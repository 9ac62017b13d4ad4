//! In-process run metrics.
//!
//! Counters are process-global and only ever grow during a run; the binary
//! logs a [`MetricsSnapshot`] when a command finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the analytics importer.
#[derive(Debug, Default)]
pub struct Metrics {
    // Provider retrieval
    pub provider_requests: Counter,
    pub provider_failures: Counter,
    pub provider_empty_days: Counter,
    pub raw_entries_fetched: Counter,
    pub snapshots_written: Counter,

    // Conversion and resolution
    pub entries_converted: Counter,
    pub store_lookups: Counter,
    pub documents_built: Counter,

    // Bulk indexing
    pub bulk_batches: Counter,
    pub documents_indexed: Counter,
    pub documents_failed: Counter,

    // Latency histograms
    pub provider_latency_ms: Histogram,
    pub bulk_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub provider_requests: u64,
    pub provider_failures: u64,
    pub provider_empty_days: u64,
    pub raw_entries_fetched: u64,
    pub snapshots_written: u64,
    pub entries_converted: u64,
    pub store_lookups: u64,
    pub documents_built: u64,
    pub bulk_batches: u64,
    pub documents_indexed: u64,
    pub documents_failed: u64,
    pub provider_latency_mean_ms: f64,
    pub bulk_latency_mean_ms: f64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            provider_requests: self.provider_requests.get(),
            provider_failures: self.provider_failures.get(),
            provider_empty_days: self.provider_empty_days.get(),
            raw_entries_fetched: self.raw_entries_fetched.get(),
            snapshots_written: self.snapshots_written.get(),
            entries_converted: self.entries_converted.get(),
            store_lookups: self.store_lookups.get(),
            documents_built: self.documents_built.get(),
            bulk_batches: self.bulk_batches.get(),
            documents_indexed: self.documents_indexed.get(),
            documents_failed: self.documents_failed.get(),
            provider_latency_mean_ms: self.provider_latency_ms.mean(),
            bulk_latency_mean_ms: self.bulk_latency_ms.mean(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

/// Log the current metrics as one structured line.
pub fn log_summary(command: &str) {
    let s = metrics().snapshot();
    info!(
        command = command,
        provider_requests = s.provider_requests,
        provider_failures = s.provider_failures,
        provider_empty_days = s.provider_empty_days,
        raw_entries_fetched = s.raw_entries_fetched,
        snapshots_written = s.snapshots_written,
        entries_converted = s.entries_converted,
        store_lookups = s.store_lookups,
        documents_built = s.documents_built,
        bulk_batches = s.bulk_batches,
        documents_indexed = s.documents_indexed,
        documents_failed = s.documents_failed,
        provider_latency_mean_ms = s.provider_latency_mean_ms,
        bulk_latency_mean_ms = s.bulk_latency_mean_ms,
        "Run summary"
    );
    debug!(
        command = command,
        provider_latency_buckets = ?metrics().provider_latency_ms.buckets(),
        bulk_latency_buckets = ?metrics().bulk_latency_ms.buckets(),
        "Latency distribution"
    );
}
