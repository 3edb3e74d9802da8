//! FlushScheduler - adaptive flush loop

use std::sync::Arc;
use std::time::Duration;

use contracts::{BatchSink, FailureStage};
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace};

use crate::decision::{self, FlushInputs};
use crate::engine::Shared;
use crate::error::BatchError;

/// Shortest sleep between ticks (ms); keeps a zero estimate from spinning
pub const MIN_TICK_MILLIS: f64 = 0.1;

/// Longest sleep between ticks (ms); bounds huge estimates
pub const MAX_TICK_MILLIS: f64 = 60_000.0;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    /// Normal operation, sleeping between ticks
    Waiting,
    /// Shutdown requested: flush without sleeping, then exit
    Draining,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    /// Buffer was empty
    Idle,
    /// Decided to keep waiting
    Deferred,
    /// Delivered this many items
    Flushed(usize),
    /// Draining and empty; buffer sealed
    Terminated,
}

/// Flush loop: runs until the drain after shutdown leaves the buffer empty
#[instrument(name = "batcher_flush_loop", skip(shared), fields(batcher = %shared.name))]
pub(crate) async fn run_flush_scheduler<T, S>(shared: Arc<Shared<T, S>>)
where
    T: Send + 'static,
    S: BatchSink<T> + Sync + 'static,
{
    debug!(batcher = %shared.name, "Flush scheduler started");
    let mut flushed_total: usize = 0;

    loop {
        let mut wait_millis = 0.0;

        if state_of(&shared) == SchedulerState::Waiting {
            if !shared.model.is_packing() {
                // Nothing can be buffered until packing is on
                tokio::select! {
                    biased;
                    _ = shared.shutdown.cancelled() => {
                        debug!(batcher = %shared.name, "Scheduler woken by shutdown");
                    }
                    _ = shared.model.packing_enabled() => {}
                }
                continue;
            }

            wait_millis = tick_millis(shared.model.estimate().latency_millis);
            tokio::select! {
                biased;
                _ = shared.shutdown.cancelled() => {
                    debug!(batcher = %shared.name, "Scheduler woken by shutdown");
                }
                _ = sleep(Duration::from_secs_f64(wait_millis / 1000.0)) => {}
            }
        }

        let state = state_of(&shared);
        match tick(&shared, wait_millis, state).await {
            TickOutcome::Terminated => break,
            TickOutcome::Flushed(count) => flushed_total += count,
            TickOutcome::Idle | TickOutcome::Deferred => {}
        }
    }

    info!(
        batcher = %shared.name,
        flushed = flushed_total,
        "Buffer drained, closing sink"
    );

    // Direct sends that passed the shutdown check finish first
    let _gate = shared.direct_gate.write().await;
    if let Err(e) = shared.sink.close().await {
        shared.report_failure(FailureStage::Close, 0, &BatchError::Sink(e));
    }

    debug!(batcher = %shared.name, "Flush scheduler stopped");
}

/// Sleep length for a latency estimate
fn tick_millis(latency_millis: f64) -> f64 {
    if latency_millis.is_nan() {
        return MIN_TICK_MILLIS;
    }
    latency_millis.clamp(MIN_TICK_MILLIS, MAX_TICK_MILLIS)
}

fn state_of<T, S>(shared: &Shared<T, S>) -> SchedulerState {
    if shared.shutdown.is_cancelled() {
        SchedulerState::Draining
    } else {
        SchedulerState::Waiting
    }
}

/// One evaluation cycle; the buffer lock is held until delivery returns
async fn tick<T, S>(shared: &Shared<T, S>, wait_millis: f64, state: SchedulerState) -> TickOutcome
where
    T: Send + 'static,
    S: BatchSink<T> + Sync + 'static,
{
    let draining = state == SchedulerState::Draining;
    let mut buffer = shared.buffer.lock().await;

    if buffer.is_empty() {
        if draining {
            buffer.seal();
            return TickOutcome::Terminated;
        }
        return TickOutcome::Idle;
    }

    let inputs = FlushInputs {
        wait_millis,
        buffer_len: buffer.len(),
        lost_millis: buffer.lost_millis(),
        total_items_sent: buffer.total_items_sent(),
        elapsed_millis: buffer.elapsed_millis(),
        estimate: shared.model.estimate(),
        draining,
    };
    let evaluation = decision::evaluate(
        &inputs,
        shared.config.avg_item_ceiling_ms,
        shared.config.next_avg_formula,
    );

    if !evaluation.should_flush() {
        buffer.set_lost_millis(evaluation.lost_millis);
        shared.metrics.inc_skipped_ticks();
        observability::record_skipped_tick(&shared.name, inputs.buffer_len);
        trace!(
            batcher = %shared.name,
            buffered = inputs.buffer_len,
            lost_ms = evaluation.lost_millis,
            avg_item_ms = evaluation.avg_item_millis,
            next_avg_item_ms = evaluation.next_avg_item_millis,
            "Flush deferred"
        );
        return TickOutcome::Deferred;
    }

    buffer.set_lost_millis(0.0);
    let items = buffer.take_all();
    let count = items.len();
    let reason = evaluation.reasons.primary();

    trace!(
        batcher = %shared.name,
        items = count,
        reason,
        latency_ms = inputs.estimate.latency_millis,
        waited_ms = evaluation.lost_millis,
        avg_item_ms = evaluation.avg_item_millis,
        "Flushing"
    );

    let result = if count > 1 {
        shared.sink.send_batch(items).await
    } else {
        match items.into_iter().next() {
            Some(item) => shared.sink.send_single(item).await,
            None => Ok(()),
        }
    };

    shared.metrics.record_flush(count);
    observability::record_flush(&shared.name, count, reason, result.is_ok());
    if let Err(e) = result {
        shared.report_failure(FailureStage::Flush, count, &BatchError::Sink(e));
    }

    drop(buffer);
    TickOutcome::Flushed(count)
}
