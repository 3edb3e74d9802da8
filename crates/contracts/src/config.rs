//! Batcher configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete configuration file: engine settings plus simulator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatcherFile {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Engine settings
    pub batcher: BatcherConfig,

    /// Simulated sink workload (used by the CLI)
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Adaptive batching engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatcherConfig {
    /// Engine name (used for logging/metrics)
    #[serde(default = "default_name")]
    pub name: String,

    /// Interval between latency probes in milliseconds
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Latency above which packing mode is switched on (milliseconds)
    #[serde(default = "default_packing_threshold_ms")]
    pub packing_threshold_ms: f64,

    /// Hard ceiling on the average per-item time before a flush is forced
    #[serde(default = "default_avg_item_ceiling_ms")]
    pub avg_item_ceiling_ms: f64,

    /// Optional bound on a single probe call
    #[serde(default)]
    pub probe_timeout_ms: Option<u64>,

    /// Formula used for the projected average item time
    #[serde(default)]
    pub next_avg_formula: NextAvgFormula,

    /// Capacity of the background failure broadcast channel
    #[serde(default = "default_failure_channel_capacity")]
    pub failure_channel_capacity: usize,
}

fn default_name() -> String {
    "batcher".to_string()
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_packing_threshold_ms() -> f64 {
    0.1
}

fn default_avg_item_ceiling_ms() -> f64 {
    5.0
}

fn default_failure_channel_capacity() -> usize {
    64
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            probe_interval_ms: default_probe_interval_ms(),
            packing_threshold_ms: default_packing_threshold_ms(),
            avg_item_ceiling_ms: default_avg_item_ceiling_ms(),
            probe_timeout_ms: None,
            next_avg_formula: NextAvgFormula::default(),
            failure_channel_capacity: default_failure_channel_capacity(),
        }
    }
}

impl BatcherConfig {
    /// Config with the given probe interval and defaults elsewhere
    pub fn with_probe_interval_ms(probe_interval_ms: u64) -> Self {
        Self {
            probe_interval_ms,
            ..Default::default()
        }
    }

    /// Check construction parameters
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                "batcher.name",
                "name cannot be empty",
            ));
        }
        if self.probe_interval_ms == 0 {
            return Err(ContractError::config_validation(
                "batcher.probe_interval_ms",
                "probe_interval_ms must be > 0",
            ));
        }
        if !self.packing_threshold_ms.is_finite() || self.packing_threshold_ms < 0.0 {
            return Err(ContractError::config_validation(
                "batcher.packing_threshold_ms",
                format!(
                    "packing_threshold_ms must be finite and >= 0, got {}",
                    self.packing_threshold_ms
                ),
            ));
        }
        if !self.avg_item_ceiling_ms.is_finite() || self.avg_item_ceiling_ms <= 0.0 {
            return Err(ContractError::config_validation(
                "batcher.avg_item_ceiling_ms",
                format!(
                    "avg_item_ceiling_ms must be finite and > 0, got {}",
                    self.avg_item_ceiling_ms
                ),
            ));
        }
        if self.probe_timeout_ms == Some(0) {
            return Err(ContractError::config_validation(
                "batcher.probe_timeout_ms",
                "probe_timeout_ms must be > 0 when set",
            ));
        }
        if self.failure_channel_capacity == 0 {
            return Err(ContractError::config_validation(
                "batcher.failure_channel_capacity",
                "failure_channel_capacity must be > 0",
            ));
        }
        Ok(())
    }
}

/// Projected average item time formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAvgFormula {
    /// Divide the current longest send time by the projected item count
    #[default]
    Reference,
    /// Divide the projected longest send time by the projected item count
    Corrected,
}

/// Simulated sink workload for the CLI
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Value returned by the simulated probe (milliseconds)
    pub probe_ms: f64,
    /// Fixed cost of every sink call (milliseconds)
    pub call_overhead_ms: f64,
    /// Incremental cost per delivered item (milliseconds)
    pub per_item_cost_ms: f64,
    /// Concurrent producer tasks
    pub producers: usize,
    /// Items offered by each producer
    pub items_per_producer: usize,
    /// Payload size of each item
    pub payload_bytes: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            probe_ms: 2.0,
            call_overhead_ms: 1.8,
            per_item_cost_ms: 0.2,
            producers: 4,
            items_per_producer: 250,
            payload_bytes: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.packing_threshold_ms, 0.1);
        assert_eq!(config.avg_item_ceiling_ms, 5.0);
        assert_eq!(config.next_avg_formula, NextAvgFormula::Reference);
    }

    #[test]
    fn test_zero_probe_interval_rejected() {
        let config = BatcherConfig::with_probe_interval_ms(0);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("probe_interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let config = BatcherConfig {
            packing_threshold_ms: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let config = BatcherConfig {
            probe_timeout_ms: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("probe_timeout_ms"), "got: {err}");
    }

    #[test]
    fn test_formula_serde_snake_case() {
        let json = serde_json::to_string(&NextAvgFormula::Corrected).unwrap();
        assert_eq!(json, "\"corrected\"");
    }
}
