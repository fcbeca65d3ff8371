//! Blob traffic counters.
//!
//! Handlers report completed reads, writes and deletes to a [`MetricsSink`]
//! with a fixed label schema of (user, repo, type). [`NoopMetrics`] is used
//! when metrics are disabled; [`CounterMetrics`] keeps Prometheus counters
//! in its own registry and renders them in the text exposition format.

use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Label names, in the order values are passed to the counters.
const LABELS: [&str; 3] = ["user", "repo", "type"];

/// Label set attached to every counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricLabels {
    /// Basic-auth user name, or empty.
    pub user: String,
    /// Repository prefix, `.` for the storage root.
    pub repo: String,
    /// Object type segment.
    pub object_type: String,
}

impl MetricLabels {
    pub fn new(
        user: impl Into<String>,
        repo: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            repo: repo.into(),
            object_type: object_type.into(),
        }
    }

    fn values(&self) -> [&str; 3] {
        [&self.user, &self.repo, &self.object_type]
    }
}

pub trait MetricsSink: Send + Sync {
    fn record_read(&self, labels: &MetricLabels, bytes: u64);
    fn record_write(&self, labels: &MetricLabels, bytes: u64);
    fn record_delete(&self, labels: &MetricLabels, bytes: u64);

    /// Prometheus text exposition, if this sink keeps anything to expose.
    fn render(&self) -> Option<String> {
        None
    }
}

pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_read(&self, _labels: &MetricLabels, _bytes: u64) {}
    fn record_write(&self, _labels: &MetricLabels, _bytes: u64) {}
    fn record_delete(&self, _labels: &MetricLabels, _bytes: u64) {}
}

/// Totals for one label set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlobCounters {
    pub read_total: u64,
    pub read_bytes: u64,
    pub write_total: u64,
    pub write_bytes: u64,
    pub delete_total: u64,
    pub delete_bytes: u64,
}

/// Blob counters registered in a private Prometheus registry.
#[derive(Clone)]
pub struct CounterMetrics {
    registry: Registry,
    read_total: IntCounterVec,
    read_bytes: IntCounterVec,
    write_total: IntCounterVec,
    write_bytes: IntCounterVec,
    delete_total: IntCounterVec,
    delete_bytes: IntCounterVec,
}

impl CounterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounterVec> {
            let vec = IntCounterVec::new(Opts::new(name, help), &LABELS)?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };

        let read_total = counter("rrs_blob_read_total", "Total number of blobs read")?;
        let read_bytes = counter(
            "rrs_blob_read_bytes_total",
            "Total number of bytes read from blobs",
        )?;
        let write_total = counter("rrs_blob_write_total", "Total number of blobs written")?;
        let write_bytes = counter(
            "rrs_blob_write_bytes_total",
            "Total number of bytes written to blobs",
        )?;
        let delete_total = counter("rrs_blob_delete_total", "Total number of blobs deleted")?;
        let delete_bytes = counter(
            "rrs_blob_delete_bytes_total",
            "Total number of bytes of blobs deleted",
        )?;

        Ok(Self {
            registry,
            read_total,
            read_bytes,
            write_total,
            write_bytes,
            delete_total,
            delete_bytes,
        })
    }

    /// The registry the counters live in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current totals for a label set.
    pub fn get(&self, labels: &MetricLabels) -> BlobCounters {
        let values = labels.values();
        BlobCounters {
            read_total: self.read_total.with_label_values(&values).get(),
            read_bytes: self.read_bytes.with_label_values(&values).get(),
            write_total: self.write_total.with_label_values(&values).get(),
            write_bytes: self.write_bytes.with_label_values(&values).get(),
            delete_total: self.delete_total.with_label_values(&values).get(),
            delete_bytes: self.delete_bytes.with_label_values(&values).get(),
        }
    }

    fn record(total: &IntCounterVec, bytes: &IntCounterVec, labels: &MetricLabels, n: u64) {
        let values = labels.values();
        total.with_label_values(&values).inc();
        bytes.with_label_values(&values).inc_by(n);
    }
}

impl MetricsSink for CounterMetrics {
    fn record_read(&self, labels: &MetricLabels, bytes: u64) {
        Self::record(&self.read_total, &self.read_bytes, labels, bytes);
    }

    fn record_write(&self, labels: &MetricLabels, bytes: u64) {
        Self::record(&self.write_total, &self.write_bytes, labels, bytes);
    }

    fn record_delete(&self, labels: &MetricLabels, bytes: u64) {
        Self::record(&self.delete_total, &self.delete_bytes, labels, bytes);
    }

    fn render(&self) -> Option<String> {
        match TextEncoder::new().encode_to_string(&self.registry.gather()) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "failed to encode metrics");
                None
            }
        }
    }
}
