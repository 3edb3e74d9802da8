//! BatchSink trait - Batcher output interface
//!
//! Defines the abstract interface the owning application implements.

use std::sync::Arc;

use crate::ContractError;

/// Downstream sink contract
///
/// All methods take `&self`: producers call the direct path concurrently
/// while the flush and probe tasks share the same sink. Implementations
/// synchronize their own state.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink<T: Send> {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Measure one round-trip cost to the real sink, in milliseconds
    ///
    /// Called once at construction and then every probe interval.
    /// Must return promptly.
    async fn probe(&self) -> Result<f64, ContractError>;

    /// Send one item immediately (packing disabled)
    ///
    /// # Errors
    /// Propagated to the caller of `offer`.
    async fn send_direct(&self, item: T) -> Result<(), ContractError>;

    /// Send several items immediately (packing disabled)
    async fn send_direct_all(&self, items: Vec<T>) -> Result<(), ContractError>;

    /// Deliver a flushed batch of more than one item
    async fn send_batch(&self, items: Vec<T>) -> Result<(), ContractError>;

    /// Deliver a flush that holds exactly one item
    async fn send_single(&self, item: T) -> Result<(), ContractError>;

    /// Teardown hook, invoked once after the final drain
    async fn close(&self) -> Result<(), ContractError>;
}

/// Shared sinks: lets the owner keep a handle to the sink it hands over
impl<T, S> BatchSink<T> for Arc<S>
where
    T: Send,
    S: BatchSink<T> + Sync,
{
    fn name(&self) -> &str {
        <S as BatchSink<T>>::name(&**self)
    }

    async fn probe(&self) -> Result<f64, ContractError> {
        <S as BatchSink<T>>::probe(&**self).await
    }

    async fn send_direct(&self, item: T) -> Result<(), ContractError> {
        <S as BatchSink<T>>::send_direct(&**self, item).await
    }

    async fn send_direct_all(&self, items: Vec<T>) -> Result<(), ContractError> {
        <S as BatchSink<T>>::send_direct_all(&**self, items).await
    }

    async fn send_batch(&self, items: Vec<T>) -> Result<(), ContractError> {
        <S as BatchSink<T>>::send_batch(&**self, items).await
    }

    async fn send_single(&self, item: T) -> Result<(), ContractError> {
        <S as BatchSink<T>>::send_single(&**self, item).await
    }

    async fn close(&self) -> Result<(), ContractError> {
        <S as BatchSink<T>>::close(&**self).await
    }
}
