//! Batcher error types

use thiserror::Error;

/// Batcher-specific errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid construction parameters
    #[error("invalid batcher configuration: {0}")]
    Config(#[source] contracts::ContractError),

    /// Sink call failed (from contract)
    #[error("sink error: {0}")]
    Sink(#[from] contracts::ContractError),

    /// Probe returned a value that cannot be a latency
    #[error("probe for sink '{sink_name}' returned invalid latency {value}")]
    InvalidProbe { sink_name: String, value: f64 },

    /// Probe did not answer within the configured bound
    #[error("probe for sink '{sink_name}' timed out after {timeout_ms}ms")]
    ProbeTimeout { sink_name: String, timeout_ms: u64 },

    /// Offer after close
    #[error("batcher '{name}' is closed")]
    Closed { name: String },

    /// Keyed offer with unequal key and value counts
    #[error("keys and values count must be the same: {keys} keys, {values} values")]
    LengthMismatch { keys: usize, values: usize },

    /// Background task panicked or was aborted
    #[error("background task '{task}' failed: {message}")]
    Join { task: &'static str, message: String },
}

impl BatchError {
    /// Create a closed error
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }

    /// Create a join error
    pub fn join(task: &'static str, message: impl Into<String>) -> Self {
        Self::Join {
            task,
            message: message.into(),
        }
    }
}
