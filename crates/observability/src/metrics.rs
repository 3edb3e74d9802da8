//! 批处理引擎指标收集模块
//!
//! 通过 `metrics` facade 记录直发、批量刷新、探测延迟与后台失败，
//! 并提供内存聚合器用于输出运行摘要。

use contracts::{FailureStage, LatencyEstimate};
use metrics::{counter, gauge, histogram};

/// 记录一次直发调用 (packing 关闭)
pub fn record_direct_send(batcher: &str, items: usize, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "batcher_direct_calls_total",
        "batcher" => batcher.to_string(),
        "status" => status
    )
    .increment(1);
    counter!("batcher_direct_items_total", "batcher" => batcher.to_string())
        .increment(items as u64);
}

/// 记录一次刷新
///
/// `reason` 为触发刷新的条件名称 (如 `ceiling`、`draining`)。
pub fn record_flush(batcher: &str, items: usize, reason: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "batcher_flushes_total",
        "batcher" => batcher.to_string(),
        "reason" => reason,
        "status" => status
    )
    .increment(1);
    counter!("batcher_flushed_items_total", "batcher" => batcher.to_string())
        .increment(items as u64);
    histogram!("batcher_flush_size", "batcher" => batcher.to_string()).record(items as f64);
}

/// 记录一次跳过的刷新周期 (继续等待)
pub fn record_skipped_tick(batcher: &str, buffered: usize) {
    counter!("batcher_skipped_ticks_total", "batcher" => batcher.to_string()).increment(1);
    gauge!("batcher_buffered_items", "batcher" => batcher.to_string()).set(buffered as f64);
}

/// 记录最新的延迟估计
pub fn record_latency_estimate(batcher: &str, estimate: &LatencyEstimate) {
    gauge!("batcher_latency_ms", "batcher" => batcher.to_string()).set(estimate.latency_millis);
    gauge!("batcher_per_item_ms", "batcher" => batcher.to_string())
        .set(estimate.per_item_millis);
    histogram!("batcher_probe_latency_ms", "batcher" => batcher.to_string())
        .record(estimate.latency_millis);
}

/// 记录 packing 模式开启 (每个实例至多一次)
pub fn record_packing_enabled(batcher: &str) {
    gauge!("batcher_packing_enabled", "batcher" => batcher.to_string()).set(1.0);
}

/// 记录后台失败
pub fn record_failure(batcher: &str, stage: FailureStage) {
    counter!(
        "batcher_background_failures_total",
        "batcher" => batcher.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// 下游投递统计聚合器
///
/// 在内存中聚合 sink 侧观察到的投递，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    /// 直发调用次数
    pub direct_calls: u64,

    /// 批量调用次数 (多于一项)
    pub batch_calls: u64,

    /// 单项刷新次数
    pub single_calls: u64,

    /// 投递总项数
    pub total_items: u64,

    /// 批量大小统计 (含单项刷新)
    pub batch_sizes: RunningStats,

    /// 每次调用的模拟耗时 (毫秒)
    pub call_cost_ms: RunningStats,
}

impl DeliveryStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录直发调用
    pub fn record_direct(&mut self, items: usize, cost_ms: f64) {
        self.direct_calls += 1;
        self.total_items += items as u64;
        self.call_cost_ms.push(cost_ms);
    }

    /// 记录批量刷新
    pub fn record_batch(&mut self, items: usize, cost_ms: f64) {
        self.batch_calls += 1;
        self.total_items += items as u64;
        self.batch_sizes.push(items as f64);
        self.call_cost_ms.push(cost_ms);
    }

    /// 记录单项刷新
    pub fn record_single(&mut self, cost_ms: f64) {
        self.single_calls += 1;
        self.total_items += 1;
        self.batch_sizes.push(1.0);
        self.call_cost_ms.push(cost_ms);
    }

    /// 下游调用总次数
    pub fn total_calls(&self) -> u64 {
        self.direct_calls + self.batch_calls + self.single_calls
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DeliverySummary {
        let calls = self.total_calls();
        DeliverySummary {
            direct_calls: self.direct_calls,
            batch_calls: self.batch_calls,
            single_calls: self.single_calls,
            total_items: self.total_items,
            items_per_call: if calls > 0 {
                self.total_items as f64 / calls as f64
            } else {
                0.0
            },
            batch_size: StatsSummary::from(&self.batch_sizes),
            call_cost_ms: StatsSummary::from(&self.call_cost_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 投递摘要
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub direct_calls: u64,
    pub batch_calls: u64,
    pub single_calls: u64,
    pub total_items: u64,
    pub items_per_call: f64,
    pub batch_size: StatsSummary,
    pub call_cost_ms: StatsSummary,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Total items: {}", self.total_items)?;
        writeln!(f, "Direct calls: {}", self.direct_calls)?;
        writeln!(f, "Batch calls: {}", self.batch_calls)?;
        writeln!(f, "Single flushes: {}", self.single_calls)?;
        writeln!(f, "Items per call: {:.2}", self.items_per_call)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        writeln!(f, "Call cost (ms): {}", self.call_cost_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_calls_and_items() {
        let mut aggregator = DeliveryStatsAggregator::new();

        aggregator.record_direct(1, 2.0);
        aggregator.record_batch(10, 4.0);
        aggregator.record_batch(30, 8.0);
        aggregator.record_single(2.0);

        assert_eq!(aggregator.total_calls(), 4);
        assert_eq!(aggregator.total_items, 42);
        assert_eq!(aggregator.batch_sizes.count(), 3);

        let summary = aggregator.summary();
        assert!((summary.items_per_call - 10.5).abs() < 1e-10);
        assert!((summary.batch_size.max - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryStatsAggregator::new();
        aggregator.record_batch(100, 5.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total items: 100"));
        assert!(output.contains("Batch calls: 1"));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // The metrics facade is a no-op until a recorder is installed.
        record_direct_send("b", 3, true);
        record_flush("b", 3, "ceiling", false);
        record_skipped_tick("b", 3);
        record_latency_estimate("b", &LatencyEstimate::from_probe(1.0));
        record_packing_enabled("b");
        record_failure("b", FailureStage::Probe);
    }
}
