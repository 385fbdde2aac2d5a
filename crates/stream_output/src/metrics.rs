//! Publisher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one output registry
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Samples handed to the transport
    published_count: AtomicU64,
    /// Samples that could not be resolved or pushed
    rejected_count: AtomicU64,
    /// Streams created
    opened_count: AtomicU64,
    /// Streams torn down
    closed_count: AtomicU64,
}

impl PublisherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_count(&self) -> u64 {
        self.published_count.load(Ordering::Relaxed)
    }

    pub fn inc_published(&self) {
        self.published_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    pub fn inc_rejected(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn opened_count(&self) -> u64 {
        self.opened_count.load(Ordering::Relaxed)
    }

    pub fn inc_opened(&self) {
        self.opened_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn closed_count(&self) -> u64 {
        self.closed_count.load(Ordering::Relaxed)
    }

    pub fn add_closed(&self, n: u64) {
        self.closed_count.fetch_add(n, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published_count: self.published_count(),
            rejected_count: self.rejected_count(),
            opened_count: self.opened_count(),
            closed_count: self.closed_count(),
        }
    }
}

/// Snapshot of publisher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published_count: u64,
    pub rejected_count: u64,
    pub opened_count: u64,
    pub closed_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = PublisherMetrics::new();
        metrics.inc_published();
        metrics.inc_published();
        metrics.inc_rejected();
        metrics.add_closed(3);
        let snap = metrics.snapshot();
        assert_eq!(snap.published_count, 2);
        assert_eq!(snap.rejected_count, 1);
        assert_eq!(snap.opened_count, 0);
        assert_eq!(snap.closed_count, 3);
    }
}
