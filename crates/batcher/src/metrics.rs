//! Batcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single batcher instance
#[derive(Debug, Default)]
pub struct BatcherMetrics {
    /// Direct sink calls (packing disabled)
    direct_calls: AtomicU64,
    /// Items sent through the direct path
    direct_items: AtomicU64,
    /// Items appended to the pending buffer
    buffered_items: AtomicU64,
    /// Flushes delivered through `send_batch`
    batch_flushes: AtomicU64,
    /// Flushes delivered through `send_single`
    single_flushes: AtomicU64,
    /// Items handed to the sink by flushes
    flushed_items: AtomicU64,
    /// Ticks that decided to keep waiting
    skipped_ticks: AtomicU64,
    /// Successful probes
    probes: AtomicU64,
    /// Failed probes
    probe_failures: AtomicU64,
    /// Failed flush deliveries
    flush_failures: AtomicU64,
}

impl BatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direct_calls(&self) -> u64 {
        self.direct_calls.load(Ordering::Relaxed)
    }

    pub fn direct_items(&self) -> u64 {
        self.direct_items.load(Ordering::Relaxed)
    }

    /// Record one direct call carrying `items`
    pub fn record_direct(&self, items: usize) {
        self.direct_calls.fetch_add(1, Ordering::Relaxed);
        self.direct_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn buffered_items(&self) -> u64 {
        self.buffered_items.load(Ordering::Relaxed)
    }

    pub fn add_buffered_items(&self, items: usize) {
        self.buffered_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn batch_flushes(&self) -> u64 {
        self.batch_flushes.load(Ordering::Relaxed)
    }

    pub fn single_flushes(&self) -> u64 {
        self.single_flushes.load(Ordering::Relaxed)
    }

    pub fn flushed_items(&self) -> u64 {
        self.flushed_items.load(Ordering::Relaxed)
    }

    /// Record one flush of `items`, routed by size
    pub fn record_flush(&self, items: usize) {
        if items > 1 {
            self.batch_flushes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.single_flushes.fetch_add(1, Ordering::Relaxed);
        }
        self.flushed_items.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_ticks(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn inc_probes(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probe_failures(&self) -> u64 {
        self.probe_failures.load(Ordering::Relaxed)
    }

    pub fn inc_probe_failures(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    pub fn inc_flush_failures(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            direct_calls: self.direct_calls(),
            direct_items: self.direct_items(),
            buffered_items: self.buffered_items(),
            batch_flushes: self.batch_flushes(),
            single_flushes: self.single_flushes(),
            flushed_items: self.flushed_items(),
            skipped_ticks: self.skipped_ticks(),
            probes: self.probes(),
            probe_failures: self.probe_failures(),
            flush_failures: self.flush_failures(),
        }
    }
}

/// Snapshot of batcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub direct_calls: u64,
    pub direct_items: u64,
    pub buffered_items: u64,
    pub batch_flushes: u64,
    pub single_flushes: u64,
    pub flushed_items: u64,
    pub skipped_ticks: u64,
    pub probes: u64,
    pub probe_failures: u64,
    pub flush_failures: u64,
}

impl MetricsSnapshot {
    /// Items that reached the sink through either path
    pub fn delivered_items(&self) -> u64 {
        self.direct_items + self.flushed_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_routing_counts() {
        let metrics = BatcherMetrics::new();
        metrics.record_flush(1);
        metrics.record_flush(7);
        metrics.record_flush(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.single_flushes, 1);
        assert_eq!(snapshot.batch_flushes, 2);
        assert_eq!(snapshot.flushed_items, 10);
    }

    #[test]
    fn test_delivered_items_sums_both_paths() {
        let metrics = BatcherMetrics::new();
        metrics.record_direct(3);
        metrics.record_direct(1);
        metrics.record_flush(5);

        assert_eq!(metrics.snapshot().delivered_items(), 9);
        assert_eq!(metrics.direct_calls(), 2);
    }
}
