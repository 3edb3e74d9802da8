//! Latency model: current cost estimate and the packing-mode switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use contracts::LatencyEstimate;
use tokio::sync::Notify;

/// Latest latency estimate plus the one-way packing switch
///
/// The prober is the only writer. Readers get a consistent
/// `(latency, per_item)` pair without taking the buffer lock.
#[derive(Debug)]
pub struct LatencyModel {
    estimate: ArcSwap<LatencyEstimate>,
    packing: AtomicBool,
    packing_threshold_ms: f64,
    packing_enabled: Notify,
}

impl LatencyModel {
    /// Create a model with a zero estimate and packing disabled
    pub fn new(packing_threshold_ms: f64) -> Self {
        Self {
            estimate: ArcSwap::from_pointee(LatencyEstimate::default()),
            packing: AtomicBool::new(false),
            packing_threshold_ms,
            packing_enabled: Notify::new(),
        }
    }

    /// Current estimate snapshot
    pub fn estimate(&self) -> LatencyEstimate {
        **self.estimate.load()
    }

    /// Whether offers are currently buffered
    pub fn is_packing(&self) -> bool {
        self.packing.load(Ordering::Acquire)
    }

    /// Publish a new probe result
    ///
    /// Returns `true` only for the call that switched packing on.
    pub fn publish(&self, probe_millis: f64) -> bool {
        let estimate = LatencyEstimate::from_probe(probe_millis);
        self.estimate.store(Arc::new(estimate));

        if estimate.latency_millis > self.packing_threshold_ms
            && !self.packing.swap(true, Ordering::AcqRel)
        {
            self.packing_enabled.notify_one();
            return true;
        }
        false
    }

    /// Resolve once packing mode is on
    pub async fn packing_enabled(&self) {
        while !self.is_packing() {
            self.packing_enabled.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publish_replaces_estimate() {
        let model = LatencyModel::new(0.1);
        model.publish(50.0);
        let estimate = model.estimate();
        assert!((estimate.latency_millis - 45.0).abs() < 1e-9);
        assert!((estimate.per_item_millis - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_packing_below_threshold_stays_off() {
        let model = LatencyModel::new(0.1);
        assert!(!model.publish(0.05));
        assert!(!model.is_packing());
    }

    #[test]
    fn test_packing_switch_is_monotonic() {
        let model = LatencyModel::new(0.1);
        assert!(model.publish(10.0));
        assert!(model.is_packing());

        // A later fast probe lowers the estimate but never reverts packing
        assert!(!model.publish(0.01));
        assert!(model.is_packing());
        assert!(model.estimate().latency_millis < 0.1);

        // Only the first transition reports
        assert!(!model.publish(10.0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 0.9 * p == threshold does not enable packing
        let model = LatencyModel::new(0.9);
        assert!(!model.publish(1.0));
        assert!(!model.is_packing());
    }

    #[tokio::test]
    async fn test_packing_enabled_wakes_waiter() {
        let model = Arc::new(LatencyModel::new(0.1));
        let waiter = {
            let model = Arc::clone(&model);
            tokio::spawn(async move { model.packing_enabled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        model.publish(1.0);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_packing_enabled_before_wait_returns_immediately() {
        let model = LatencyModel::new(0.1);
        model.publish(1.0);
        tokio::time::timeout(Duration::from_millis(100), model.packing_enabled())
            .await
            .expect("already packing");
    }
}
