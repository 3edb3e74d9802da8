//! KeyedBatcher - key/value front-end over a pair batcher

use contracts::{BatchSink, BatcherConfig};

use crate::engine::{Batcher, BatcherTasks};
use crate::error::BatchError;

/// Batcher whose items are `(key, value)` pairs
///
/// Pairs travel to the sink unchanged; keys are never inspected.
pub struct KeyedBatcher<K, V, S> {
    inner: Batcher<(K, V), S>,
}

impl<K, V, S> Clone for KeyedBatcher<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S> KeyedBatcher<K, V, S>
where
    K: Send + 'static,
    V: Send + 'static,
    S: BatchSink<(K, V)> + Sync + 'static,
{
    /// Start a keyed batcher; see [`Batcher::spawn`]
    pub async fn spawn(sink: S, config: BatcherConfig) -> Result<(Self, BatcherTasks), BatchError> {
        let (inner, tasks) = Batcher::spawn(sink, config).await?;
        Ok((Self { inner }, tasks))
    }

    pub async fn offer(&self, key: K, value: V) -> Result<(), BatchError> {
        self.inner.offer((key, value)).await
    }

    /// Offer `keys[i]` with `values[i]` as one call
    ///
    /// # Errors
    /// `BatchError::LengthMismatch` when the counts differ; nothing is offered.
    pub async fn offer_pairs(&self, keys: Vec<K>, values: Vec<V>) -> Result<(), BatchError> {
        if keys.len() != values.len() {
            return Err(BatchError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }

        let mut pairs: Vec<(K, V)> = keys.into_iter().zip(values).collect();
        if pairs.len() == 1 {
            if let Some(pair) = pairs.pop() {
                return self.inner.offer(pair).await;
            }
        }
        self.inner.offer_all(pairs).await
    }
}

impl<K, V, S> KeyedBatcher<K, V, S> {
    /// Underlying pair batcher
    pub fn batcher(&self) -> &Batcher<(K, V), S> {
        &self.inner
    }

    pub fn close(&self) {
        self.inner.close();
    }
}
