//! Batcher - front door, shared state and task lifecycle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{BatchSink, BatcherConfig, FailureEvent, FailureStage, LatencyEstimate};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::buffer::PendingBuffer;
use crate::error::BatchError;
use crate::latency::LatencyModel;
use crate::metrics::BatcherMetrics;
use crate::prober::run_prober;
use crate::scheduler::run_flush_scheduler;

/// State shared by the front door and both background tasks
pub(crate) struct Shared<T, S> {
    pub(crate) name: String,
    pub(crate) config: BatcherConfig,
    pub(crate) sink: S,
    pub(crate) model: LatencyModel,
    pub(crate) buffer: Mutex<PendingBuffer<T>>,
    pub(crate) metrics: Arc<BatcherMetrics>,
    pub(crate) failures: broadcast::Sender<FailureEvent>,
    pub(crate) shutdown: CancellationToken,
    /// Read-held by in-flight direct sends; the scheduler takes it for write
    /// before closing the sink
    pub(crate) direct_gate: RwLock<()>,
    close_requested: AtomicBool,
}

impl<T, S> Shared<T, S> {
    pub(crate) fn new(sink: S, config: BatcherConfig) -> Self {
        let (failures, _) = broadcast::channel(config.failure_channel_capacity);
        Self {
            name: config.name.clone(),
            model: LatencyModel::new(config.packing_threshold_ms),
            buffer: Mutex::new(PendingBuffer::new()),
            metrics: Arc::new(BatcherMetrics::new()),
            failures,
            shutdown: CancellationToken::new(),
            direct_gate: RwLock::new(()),
            close_requested: AtomicBool::new(false),
            sink,
            config,
        }
    }

    /// Log, count and publish a failure that has no caller to return to
    pub(crate) fn report_failure(&self, stage: FailureStage, items: usize, err: &BatchError) {
        match stage {
            FailureStage::Probe => {
                self.metrics.inc_probe_failures();
                warn!(batcher = %self.name, error = %err, "Probe failed, keeping previous estimate");
            }
            FailureStage::Flush => {
                self.metrics.inc_flush_failures();
                error!(batcher = %self.name, items, error = %err, "Flush failed, batch dropped");
            }
            FailureStage::Close => {
                error!(batcher = %self.name, error = %err, "Sink close failed");
            }
        }
        observability::record_failure(&self.name, stage);

        // No subscribers is fine
        let _ = self.failures.send(FailureEvent {
            batcher: self.name.clone(),
            stage,
            items,
            message: err.to_string(),
        });
    }
}

/// Adaptive batcher in front of a sink
///
/// Cheap to clone; every clone feeds the same buffer. Background tasks run
/// until [`Batcher::close`] is called, dropping every handle does not stop
/// them.
pub struct Batcher<T, S> {
    shared: Arc<Shared<T, S>>,
}

impl<T, S> Clone for Batcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, S> Batcher<T, S>
where
    T: Send + 'static,
    S: BatchSink<T> + Sync + 'static,
{
    /// Validate config, seed the latency model and start both tasks
    ///
    /// # Errors
    /// `BatchError::Config` for an invalid config; any error from the seed
    /// probe is returned as is and no task is started.
    #[instrument(name = "batcher_spawn", skip(sink, config), fields(batcher = %config.name))]
    pub async fn spawn(sink: S, config: BatcherConfig) -> Result<(Self, BatcherTasks), BatchError> {
        config.validate().map_err(BatchError::Config)?;

        let name = config.name.clone();
        let shared = Arc::new(Shared::new(sink, config));

        let seed = shared.refresh_latency().await?;
        info!(
            batcher = %name,
            sink = shared.sink.name(),
            latency_ms = seed.latency_millis,
            per_item_ms = seed.per_item_millis,
            packing = shared.model.is_packing(),
            "Batcher started"
        );

        let prober = tokio::spawn(run_prober(Arc::clone(&shared)));
        let scheduler = tokio::spawn(run_flush_scheduler(Arc::clone(&shared)));

        let tasks = BatcherTasks {
            name,
            prober,
            scheduler,
        };
        Ok((Self { shared }, tasks))
    }

    /// Offer one item
    ///
    /// Packing off: `send_direct` on the caller's task, errors propagate.
    /// Packing on: appended to the pending buffer.
    pub async fn offer(&self, item: T) -> Result<(), BatchError> {
        let shared = &self.shared;
        let gate = shared.direct_gate.read().await;
        if shared.shutdown.is_cancelled() {
            return Err(BatchError::closed(&shared.name));
        }

        if !shared.model.is_packing() {
            let result = shared.sink.send_direct(item).await;
            drop(gate);
            shared.metrics.record_direct(1);
            observability::record_direct_send(&shared.name, 1, result.is_ok());
            return result.map_err(BatchError::from);
        }

        drop(gate);
        let mut buffer = shared.buffer.lock().await;
        if buffer.is_sealed() {
            return Err(BatchError::closed(&shared.name));
        }
        buffer.push(item);
        shared.metrics.add_buffered_items(1);
        Ok(())
    }

    /// Offer several items as one call
    ///
    /// An empty vector is a no-op.
    pub async fn offer_all(&self, items: Vec<T>) -> Result<(), BatchError> {
        if items.is_empty() {
            return Ok(());
        }

        let shared = &self.shared;
        let gate = shared.direct_gate.read().await;
        if shared.shutdown.is_cancelled() {
            return Err(BatchError::closed(&shared.name));
        }

        if !shared.model.is_packing() {
            let count = items.len();
            let result = shared.sink.send_direct_all(items).await;
            drop(gate);
            shared.metrics.record_direct(count);
            observability::record_direct_send(&shared.name, count, result.is_ok());
            return result.map_err(BatchError::from);
        }

        drop(gate);
        let mut buffer = shared.buffer.lock().await;
        if buffer.is_sealed() {
            return Err(BatchError::closed(&shared.name));
        }
        let count = buffer.extend(items);
        shared.metrics.add_buffered_items(count);
        Ok(())
    }

    /// Snapshot of the buffered item count (takes the buffer lock)
    pub async fn buffered_len(&self) -> usize {
        self.shared.buffer.lock().await.len()
    }
}

impl<T, S> Batcher<T, S> {
    /// Request shutdown; does not wait
    ///
    /// The scheduler drains what is buffered, waits for direct sends already
    /// in flight, and then closes the sink. Await [`BatcherTasks::join`] for completion. Repeated calls are no-ops.
    pub fn close(&self) {
        if self.shared.close_requested.swap(true, Ordering::AcqRel) {
            debug!(batcher = %self.shared.name, "Close already requested");
            return;
        }
        info!(batcher = %self.shared.name, "Close requested, draining");
        self.shared.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn is_packing(&self) -> bool {
        self.shared.model.is_packing()
    }

    /// Current latency estimate
    pub fn estimate(&self) -> LatencyEstimate {
        self.shared.model.estimate()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn metrics(&self) -> &Arc<BatcherMetrics> {
        &self.shared.metrics
    }

    /// Receive failures from the background tasks
    pub fn subscribe_failures(&self) -> broadcast::Receiver<FailureEvent> {
        self.shared.failures.subscribe()
    }
}

/// Join handles of the prober and flush scheduler
pub struct BatcherTasks {
    name: String,
    prober: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

impl BatcherTasks {
    /// Wait for both tasks to exit
    ///
    /// Only resolves after `close()` has been called on the batcher.
    #[instrument(name = "batcher_tasks_join", skip(self), fields(batcher = %self.name))]
    pub async fn join(self) -> Result<(), BatchError> {
        let prober = self.prober.await;
        let scheduler = self.scheduler.await;

        if let Err(e) = prober {
            error!(batcher = %self.name, error = ?e, "Prober task panicked");
            return Err(BatchError::join("prober", e.to_string()));
        }
        if let Err(e) = scheduler {
            error!(batcher = %self.name, error = ?e, "Flush scheduler task panicked");
            return Err(BatchError::join("flush_scheduler", e.to_string()));
        }

        info!(batcher = %self.name, "Batcher stopped");
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.prober.is_finished() && self.scheduler.is_finished()
    }
}
