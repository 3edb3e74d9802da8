//! Prober - periodic latency refresh task

use std::sync::Arc;
use std::time::Duration;

use contracts::{BatchSink, FailureStage, LatencyEstimate};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument};

use crate::engine::Shared;
use crate::error::BatchError;

/// Call the sink's probe once and validate the answer
pub(crate) async fn probe_sink<T, S>(sink: &S, timeout_ms: Option<u64>) -> Result<f64, BatchError>
where
    T: Send + 'static,
    S: BatchSink<T> + Sync,
{
    let value = match timeout_ms {
        Some(ms) => timeout(Duration::from_millis(ms), sink.probe())
            .await
            .map_err(|_| BatchError::ProbeTimeout {
                sink_name: sink.name().to_string(),
                timeout_ms: ms,
            })??,
        None => sink.probe().await?,
    };

    if !value.is_finite() || value < 0.0 {
        return Err(BatchError::InvalidProbe {
            sink_name: sink.name().to_string(),
            value,
        });
    }
    Ok(value)
}

impl<T, S> Shared<T, S>
where
    T: Send + 'static,
    S: BatchSink<T> + Sync + 'static,
{
    /// Probe the sink and publish the resulting estimate
    #[instrument(name = "batcher_refresh_latency", level = "debug", skip(self), fields(batcher = %self.name))]
    pub(crate) async fn refresh_latency(&self) -> Result<LatencyEstimate, BatchError> {
        let probe_millis = probe_sink(&self.sink, self.config.probe_timeout_ms).await?;
        let enabled = self.model.publish(probe_millis);
        let estimate = self.model.estimate();

        self.metrics.inc_probes();
        observability::record_latency_estimate(&self.name, &estimate);
        debug!(
            batcher = %self.name,
            probe_ms = probe_millis,
            latency_ms = estimate.latency_millis,
            per_item_ms = estimate.per_item_millis,
            "Latency refreshed"
        );

        if enabled {
            observability::record_packing_enabled(&self.name);
            info!(
                batcher = %self.name,
                latency_ms = estimate.latency_millis,
                threshold_ms = self.config.packing_threshold_ms,
                "Packing mode enabled"
            );
        }

        Ok(estimate)
    }
}

/// Prober loop: refresh every probe interval until shutdown
#[instrument(name = "batcher_prober_loop", skip(shared), fields(batcher = %shared.name))]
pub(crate) async fn run_prober<T, S>(shared: Arc<Shared<T, S>>)
where
    T: Send + 'static,
    S: BatchSink<T> + Sync + 'static,
{
    let interval = Duration::from_millis(shared.config.probe_interval_ms);
    debug!(batcher = %shared.name, interval_ms = shared.config.probe_interval_ms, "Prober started");

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => {
                debug!(batcher = %shared.name, "Prober woken by shutdown");
                break;
            }
            _ = sleep(interval) => {}
        }

        if let Err(e) = shared.refresh_latency().await {
            // No update this cycle; keep the previous estimate
            shared.report_failure(FailureStage::Probe, 0, &e);
        }
    }

    debug!(batcher = %shared.name, "Prober stopped");
}
