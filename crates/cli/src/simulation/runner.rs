//! Simulation runner - spawns producers and drives the batcher to completion.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use batcher::{Batcher, BatchError};
use bytes::{BufMut, Bytes, BytesMut};
use contracts::{BatcherConfig, SimulationConfig};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{SimulatedSink, SimulationStats};

/// One simulation run
#[derive(Debug, Clone)]
pub struct Simulation {
    batcher: BatcherConfig,
    simulation: SimulationConfig,
}

impl Simulation {
    pub fn new(batcher: BatcherConfig, simulation: SimulationConfig) -> Self {
        Self {
            batcher,
            simulation,
        }
    }

    /// Run every producer to completion, or until `shutdown` resolves
    ///
    /// Both ways end with a close and join, so buffered items are flushed.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SimulationStats> {
        let started = Instant::now();
        let sink = SimulatedSink::new(format!("{}-sink", self.batcher.name), &self.simulation);
        let delivery = sink.stats();

        let (batcher, tasks) = Batcher::spawn(sink, self.batcher.clone())
            .await
            .context("Failed to start batcher")?;

        let mut failures = batcher.subscribe_failures();
        let failure_counter = tokio::spawn(async move {
            let mut count = 0usize;
            loop {
                match failures.recv().await {
                    Ok(event) => {
                        warn!(stage = %event.stage, items = event.items, error = %event.message, "Background failure");
                        count += 1;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        count += missed as usize;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            count
        });

        info!(
            producers = self.simulation.producers,
            items_per_producer = self.simulation.items_per_producer,
            packing = batcher.is_packing(),
            "Starting producers"
        );

        let mut producers = JoinSet::new();
        for producer in 0..self.simulation.producers {
            let batcher = batcher.clone();
            let items = self.simulation.items_per_producer;
            let payload_bytes = self.simulation.payload_bytes;
            producers.spawn(async move { produce(batcher, producer, items, payload_bytes).await });
        }

        let mut offered = 0usize;
        let mut interrupted = false;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                joined = producers.join_next() => match joined {
                    Some(Ok(Ok(count))) => offered += count,
                    Some(Ok(Err(e))) => {
                        producers.abort_all();
                        batcher.close();
                        tasks.join().await.ok();
                        return Err(e).context("Producer failed");
                    }
                    Some(Err(e)) => warn!(error = %e, "Producer task aborted"),
                    None => break,
                },
                _ = &mut shutdown, if !interrupted => {
                    warn!("Shutdown signal received, closing batcher");
                    interrupted = true;
                    batcher.close();
                }
            }
        }

        batcher.close();
        tasks.join().await.context("Batcher tasks failed")?;
        let snapshot = batcher.metrics().snapshot();
        let estimate = batcher.estimate();
        let packing = batcher.is_packing();
        drop(batcher);

        let failures = failure_counter.await.unwrap_or(0);
        let delivery = delivery
            .lock()
            .map_err(|_| anyhow::anyhow!("delivery stats lock poisoned"))?
            .summary();

        debug!(offered, failures, "Simulation finished");

        Ok(SimulationStats {
            items_offered: offered as u64,
            duration: started.elapsed(),
            interrupted,
            packing,
            latency_ms: estimate.latency_millis,
            failures,
            batcher: snapshot,
            delivery,
        })
    }
}

/// Offer `items` payloads; stops early once the batcher is closed
async fn produce(
    batcher: Batcher<Bytes, SimulatedSink>,
    producer: usize,
    items: usize,
    payload_bytes: usize,
) -> Result<usize, BatchError> {
    let mut offered = 0;
    for seq in 0..items {
        match batcher.offer(payload(producer, seq, payload_bytes)).await {
            Ok(()) => offered += 1,
            Err(BatchError::Closed { .. }) => {
                debug!(producer, offered, "Batcher closed, producer stopping");
                break;
            }
            Err(e) => return Err(e),
        }
        tokio::task::yield_now().await;
    }
    Ok(offered)
}

/// Payload: producer id and sequence number, zero-padded to `size`
fn payload(producer: usize, seq: usize, size: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(size.max(16));
    buf.put_u64(producer as u64);
    buf.put_u64(seq as u64);
    if size > buf.len() {
        buf.put_bytes(0, size - buf.len());
    }
    buf.freeze()
}
