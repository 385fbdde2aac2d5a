//! Marker input metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Marker input metrics
#[derive(Debug, Default)]
pub struct MarkerMetrics {
    /// Total marker samples drained
    pub samples_received: AtomicU64,

    /// Drain passes that skipped a disconnected subscription
    pub skipped_disconnected: AtomicU64,

    /// Datagrams that failed to decode
    pub decode_errors: AtomicU64,
}

impl MarkerMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record drained samples
    pub fn record_received(&self, n: u64) {
        self.samples_received.fetch_add(n, Ordering::Relaxed);
    }

    /// Record a skipped subscription
    pub fn record_skipped(&self) {
        self.skipped_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record decode error
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            skipped_disconnected: self.skipped_disconnected.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total marker samples drained
    pub samples_received: u64,

    /// Drain passes that skipped a disconnected subscription
    pub skipped_disconnected: u64,

    /// Datagrams that failed to decode
    pub decode_errors: u64,
}
