//! Simulation statistics.

use std::time::Duration;

use batcher::MetricsSnapshot;
use observability::DeliverySummary;

/// Statistics from a simulation run
#[derive(Debug, Clone)]
pub struct SimulationStats {
    /// Items accepted by `offer`
    pub items_offered: u64,

    /// Wall time from spawn to join
    pub duration: Duration,

    /// Stopped by a shutdown signal before producers finished
    pub interrupted: bool,

    /// Whether any item went through the buffer
    pub packing: bool,

    /// Last latency estimate (ms)
    pub latency_ms: f64,

    /// Background failures observed
    pub failures: usize,

    /// Batcher counters
    pub batcher: MetricsSnapshot,

    /// Sink-side delivery statistics
    pub delivery: DeliverySummary,
}

impl SimulationStats {
    /// Delivered items per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.delivery.total_items as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Simulation Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Items offered: {}", self.items_offered);
        println!("   ├─ Items delivered: {}", self.delivery.total_items);
        println!("   ├─ Throughput: {:.1} items/s", self.throughput());
        println!("   ├─ Packing mode: {}", if self.packing { "on" } else { "off" });
        println!("   ├─ Latency estimate: {:.3} ms", self.latency_ms);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\nSink calls");
        println!("   ├─ Direct: {}", self.delivery.direct_calls);
        println!("   ├─ Batches: {}", self.delivery.batch_calls);
        println!("   ├─ Single flushes: {}", self.delivery.single_calls);
        println!("   ├─ Items per call: {:.2}", self.delivery.items_per_call);
        println!("   ├─ Batch size: {}", self.delivery.batch_size);
        println!("   └─ Call cost (ms): {}", self.delivery.call_cost_ms);

        println!("\nScheduler");
        println!("   ├─ Skipped ticks: {}", self.batcher.skipped_ticks);
        println!("   ├─ Probes: {}", self.batcher.probes);
        println!("   ├─ Probe failures: {}", self.batcher.probe_failures);
        println!("   └─ Background failures: {}", self.failures);

        println!();
    }
}
