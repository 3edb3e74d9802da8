//! SimulatedSink - a sink whose calls cost fixed overhead plus per-item time

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use contracts::{BatchSink, ContractError, SimulationConfig};
use observability::DeliveryStatsAggregator;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

/// Sink standing in for a slow peer
///
/// Every call sleeps `call_overhead_ms + items * per_item_cost_ms`. The
/// probe answers with the configured round-trip cost without sleeping.
pub struct SimulatedSink {
    name: String,
    probe_ms: f64,
    call_overhead_ms: f64,
    per_item_cost_ms: f64,
    stats: Arc<Mutex<DeliveryStatsAggregator>>,
}

impl SimulatedSink {
    pub fn new(name: impl Into<String>, config: &SimulationConfig) -> Self {
        Self {
            name: name.into(),
            probe_ms: config.probe_ms,
            call_overhead_ms: config.call_overhead_ms,
            per_item_cost_ms: config.per_item_cost_ms,
            stats: Arc::new(Mutex::new(DeliveryStatsAggregator::new())),
        }
    }

    /// Handle to the delivery statistics, readable after the sink is moved
    pub fn stats(&self) -> Arc<Mutex<DeliveryStatsAggregator>> {
        Arc::clone(&self.stats)
    }

    /// Simulated cost of one call carrying `items`
    fn call_cost_ms(&self, items: usize) -> f64 {
        self.call_overhead_ms + items as f64 * self.per_item_cost_ms
    }

    async fn deliver(&self, items: usize, payload_bytes: usize) -> Result<f64, ContractError> {
        let started = Instant::now();
        let cost_ms = self.call_cost_ms(items);
        if cost_ms > 0.0 {
            sleep(Duration::from_secs_f64(cost_ms / 1000.0)).await;
        }
        debug!(sink = %self.name, items, payload_bytes, cost_ms, "Delivered");
        Ok(started.elapsed().as_secs_f64() * 1000.0)
    }

    fn with_stats(&self, record: impl FnOnce(&mut DeliveryStatsAggregator)) -> Result<(), ContractError> {
        let mut stats = self
            .stats
            .lock()
            .map_err(|_| ContractError::sink_send(&self.name, "stats lock poisoned"))?;
        record(&mut stats);
        Ok(())
    }
}

fn total_len(items: &[Bytes]) -> usize {
    items.iter().map(Bytes::len).sum()
}

impl BatchSink<Bytes> for SimulatedSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<f64, ContractError> {
        Ok(self.probe_ms)
    }

    async fn send_direct(&self, item: Bytes) -> Result<(), ContractError> {
        let cost = self.deliver(1, item.len()).await?;
        self.with_stats(|stats| stats.record_direct(1, cost))
    }

    async fn send_direct_all(&self, items: Vec<Bytes>) -> Result<(), ContractError> {
        let cost = self.deliver(items.len(), total_len(&items)).await?;
        self.with_stats(|stats| stats.record_direct(items.len(), cost))
    }

    #[instrument(name = "simulated_sink_batch", skip(self, items), fields(sink = %self.name, items = items.len()))]
    async fn send_batch(&self, items: Vec<Bytes>) -> Result<(), ContractError> {
        let cost = self.deliver(items.len(), total_len(&items)).await?;
        self.with_stats(|stats| stats.record_batch(items.len(), cost))
    }

    async fn send_single(&self, item: Bytes) -> Result<(), ContractError> {
        let cost = self.deliver(1, item.len()).await?;
        self.with_stats(|stats| stats.record_single(cost))
    }

    async fn close(&self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "SimulatedSink closed");
        Ok(())
    }
}
