//! LogSink - logs every delivery via tracing

use std::fmt::Debug;

use contracts::{BatchSink, ContractError};
use tracing::{debug, info, instrument};

/// Sink that only logs what it receives, for debugging
///
/// The probe answer is fixed at construction, so the same sink can stand in
/// for a fast or a slow peer.
pub struct LogSink {
    name: String,
    probe_millis: f64,
}

impl LogSink {
    /// Create a new LogSink with the given name and probe answer
    pub fn new(name: impl Into<String>, probe_millis: f64) -> Self {
        Self {
            name: name.into(),
            probe_millis,
        }
    }
}

impl<T: Debug + Send + 'static> BatchSink<T> for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<f64, ContractError> {
        Ok(self.probe_millis)
    }

    #[instrument(name = "log_sink_direct", skip(self, item), fields(sink = %self.name))]
    async fn send_direct(&self, item: T) -> Result<(), ContractError> {
        debug!(sink = %self.name, item = ?item, "Direct item");
        Ok(())
    }

    async fn send_direct_all(&self, items: Vec<T>) -> Result<(), ContractError> {
        debug!(sink = %self.name, items = items.len(), "Direct items");
        Ok(())
    }

    #[instrument(name = "log_sink_batch", skip(self, items), fields(sink = %self.name, items = items.len()))]
    async fn send_batch(&self, items: Vec<T>) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            items = items.len(),
            first = ?items.first(),
            "Batch received"
        );
        Ok(())
    }

    async fn send_single(&self, item: T) -> Result<(), ContractError> {
        info!(sink = %self.name, item = ?item, "Single-item batch received");
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
