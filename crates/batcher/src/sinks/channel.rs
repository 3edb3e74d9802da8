//! ChannelSink - forwards every delivery into an mpsc channel

use contracts::{BatchSink, ContractError};
use tokio::sync::mpsc;
use tracing::debug;

/// One sink call as seen by the receiving side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T> {
    /// `send_direct`
    Direct(T),
    /// `send_direct_all`
    DirectAll(Vec<T>),
    /// `send_batch`
    Batch(Vec<T>),
    /// `send_single`
    Single(T),
}

impl<T> Delivery<T> {
    /// Number of items carried by this call
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(_) | Self::Single(_) => 1,
            Self::DirectAll(items) | Self::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the call came from a flush rather than the direct path
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Batch(_) | Self::Single(_))
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Direct(item) | Self::Single(item) => vec![item],
            Self::DirectAll(items) | Self::Batch(items) => items,
        }
    }
}

/// Sink that hands deliveries to another task
///
/// The receiver side is unbounded so a slow consumer never stalls the flush
/// loop. `close` drops nothing; the channel ends when the sink is dropped.
pub struct ChannelSink<T> {
    name: String,
    probe_millis: f64,
    tx: mpsc::UnboundedSender<Delivery<T>>,
}

impl<T> ChannelSink<T> {
    /// Create a sink and the receiver for its deliveries
    pub fn new(
        name: impl Into<String>,
        probe_millis: f64,
    ) -> (Self, mpsc::UnboundedReceiver<Delivery<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            name: name.into(),
            probe_millis,
            tx,
        };
        (sink, rx)
    }

    fn forward(&self, delivery: Delivery<T>) -> Result<(), ContractError> {
        self.tx
            .send(delivery)
            .map_err(|_| ContractError::sink_send(&self.name, "receiver dropped"))
    }
}

impl<T: Send + 'static> BatchSink<T> for ChannelSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<f64, ContractError> {
        Ok(self.probe_millis)
    }

    async fn send_direct(&self, item: T) -> Result<(), ContractError> {
        self.forward(Delivery::Direct(item))
    }

    async fn send_direct_all(&self, items: Vec<T>) -> Result<(), ContractError> {
        self.forward(Delivery::DirectAll(items))
    }

    async fn send_batch(&self, items: Vec<T>) -> Result<(), ContractError> {
        self.forward(Delivery::Batch(items))
    }

    async fn send_single(&self, item: T) -> Result<(), ContractError> {
        self.forward(Delivery::Single(item))
    }

    async fn close(&self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "ChannelSink closed");
        Ok(())
    }
}
