//! FailureEvent - background failure report
//!
//! Probe and flush failures happen on background tasks with no caller to
//! return an error to; they are published as events instead.

use std::fmt;

/// Where a background failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Periodic latency probe
    Probe,
    /// Batch or single-item flush delivery
    Flush,
    /// Sink teardown after the final drain
    Close,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Probe => "probe",
            Self::Flush => "flush",
            Self::Close => "close",
        };
        f.write_str(stage)
    }
}

/// Report of a failed background operation
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEvent {
    /// Batcher that observed the failure
    pub batcher: String,
    /// Failed stage
    pub stage: FailureStage,
    /// Items lost with the failed delivery (0 for probe/close)
    pub items: usize,
    /// Rendered error
    pub message: String,
}
