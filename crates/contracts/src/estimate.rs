//! LatencyEstimate - Prober output
//!
//! Immutable latency snapshot consumed by the offer path and the flush scheduler.

use serde::{Deserialize, Serialize};

/// Share of a probe result attributed to fixed per-call overhead
pub const LATENCY_SHARE: f64 = 0.9;

/// Share of a probe result attributed to per-item transfer cost
pub const PER_ITEM_SHARE: f64 = 0.1;

/// Round-trip cost model derived from a single probe
///
/// Replaced wholesale on every probe, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyEstimate {
    /// Fixed per-call overhead (milliseconds)
    pub latency_millis: f64,
    /// Incremental per-item cost (milliseconds)
    pub per_item_millis: f64,
}

impl LatencyEstimate {
    /// Split a probe result into call overhead and per-item cost
    pub fn from_probe(probe_millis: f64) -> Self {
        Self {
            latency_millis: LATENCY_SHARE * probe_millis,
            per_item_millis: PER_ITEM_SHARE * probe_millis,
        }
    }
}
