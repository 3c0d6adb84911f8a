use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_processed: AtomicU64,
    records_failed: AtomicU64,
    batches_succeeded: AtomicU64,
    batches_failed: AtomicU64,
    batches_skipped: AtomicU64,
    steps_executed: AtomicU64,
    steps_skipped: AtomicU64,
}

/// Run counters shared between the executor and the record runner.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_processed: u64,
    pub records_failed: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    pub batches_skipped: u64,
    pub steps_executed: u64,
    pub steps_skipped: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_processed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_record_failures(&self, count: u64) {
        self.inner.records_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batch_success(&self) {
        self.inner.batches_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batch_failure(&self) {
        self.inner.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batch_skipped(&self) {
        self.inner.batches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_steps_executed(&self) {
        self.inner.steps_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_steps_skipped(&self) {
        self.inner.steps_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_processed: self.inner.records_processed.load(Ordering::Relaxed),
            records_failed: self.inner.records_failed.load(Ordering::Relaxed),
            batches_succeeded: self.inner.batches_succeeded.load(Ordering::Relaxed),
            batches_failed: self.inner.batches_failed.load(Ordering::Relaxed),
            batches_skipped: self.inner.batches_skipped.load(Ordering::Relaxed),
            steps_executed: self.inner.steps_executed.load(Ordering::Relaxed),
            steps_skipped: self.inner.steps_skipped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
