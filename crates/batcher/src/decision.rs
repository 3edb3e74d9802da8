//! Flush/wait decision model.
//!
//! Evaluated once per flush tick with the buffer lock held. All times are
//! milliseconds; rates are items per millisecond.

use contracts::{LatencyEstimate, NextAvgFormula};

/// Substitute added to an exactly-zero denominator
const DENOMINATOR_EPSILON: f64 = 1e-21;

fn not_zero(value: f64) -> f64 {
    if value != 0.0 {
        value
    } else {
        value + DENOMINATOR_EPSILON
    }
}

/// State observed by one flush tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushInputs {
    /// Latency value used for the sleep just taken
    pub wait_millis: f64,
    /// Items currently buffered
    pub buffer_len: usize,
    /// Wait time accumulated since the last flush
    pub lost_millis: f64,
    /// Items buffered since start
    pub total_items_sent: f64,
    /// Wall time since start
    pub elapsed_millis: f64,
    /// Latest latency estimate
    pub estimate: LatencyEstimate,
    /// Shutdown requested
    pub draining: bool,
}

/// Which conditions asked for a flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReasons {
    /// Items arrive slower than one per tick
    pub arrival_slower: bool,
    /// Waiting one more tick would lower throughput
    pub throughput_drop: bool,
    /// Waiting saves less than one tick of per-item time
    pub marginal_gain: bool,
    /// Average item time is above the hard ceiling
    pub ceiling: bool,
    /// Shutdown drain
    pub draining: bool,
}

impl FlushReasons {
    pub fn any(&self) -> bool {
        self.arrival_slower || self.throughput_drop || self.marginal_gain || self.ceiling || self.draining
    }

    /// Label of the most significant reason, for metrics
    pub fn primary(&self) -> &'static str {
        if self.draining {
            "draining"
        } else if self.ceiling {
            "ceiling"
        } else if self.arrival_slower {
            "arrival_slower"
        } else if self.throughput_drop {
            "throughput_drop"
        } else if self.marginal_gain {
            "marginal_gain"
        } else {
            "none"
        }
    }
}

/// Full result of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushEvaluation {
    /// `lost_millis + wait_millis`; stored back when the tick waits
    pub lost_millis: f64,
    pub ideal_items_per_millis: f64,
    pub ideal_millis_per_item: f64,
    pub longest_send_millis: f64,
    pub items_per_millis: f64,
    pub avg_item_millis: f64,
    pub next_longest_send_millis: f64,
    pub next_items_per_millis: f64,
    pub next_avg_item_millis: f64,
    pub reasons: FlushReasons,
}

impl FlushEvaluation {
    pub fn should_flush(&self) -> bool {
        self.reasons.any()
    }
}

/// Decide whether this tick flushes
pub fn evaluate(
    inputs: &FlushInputs,
    avg_item_ceiling_ms: f64,
    formula: NextAvgFormula,
) -> FlushEvaluation {
    let latency = inputs.estimate.latency_millis;
    let per_item = inputs.estimate.per_item_millis;
    let wait = inputs.wait_millis;
    let size = inputs.buffer_len as f64;
    let lost = inputs.lost_millis + wait;

    let ideal_items_per_millis = inputs.total_items_sent / not_zero(inputs.elapsed_millis);
    let ideal_millis_per_item = 1.0 / not_zero(ideal_items_per_millis);

    let longest_send_millis = lost + latency + size * per_item;
    let items_per_millis = size / not_zero(longest_send_millis);
    let avg_item_millis = longest_send_millis / not_zero(size);

    let projected_size = size + wait * ideal_items_per_millis;
    let next_longest_send_millis = lost + latency + wait + projected_size * per_item;
    let next_items_per_millis = projected_size / not_zero(next_longest_send_millis);
    let next_avg_item_millis = match formula {
        NextAvgFormula::Reference => longest_send_millis / not_zero(projected_size),
        NextAvgFormula::Corrected => next_longest_send_millis / not_zero(projected_size),
    };

    let reasons = FlushReasons {
        arrival_slower: ideal_millis_per_item > latency,
        throughput_drop: items_per_millis > next_items_per_millis,
        marginal_gain: (avg_item_millis - next_avg_item_millis) < latency,
        ceiling: avg_item_millis > avg_item_ceiling_ms,
        draining: inputs.draining,
    };

    FlushEvaluation {
        lost_millis: lost,
        ideal_items_per_millis,
        ideal_millis_per_item,
        longest_send_millis,
        items_per_millis,
        avg_item_millis,
        next_longest_send_millis,
        next_items_per_millis,
        next_avg_item_millis,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CEILING: f64 = 5.0;

    /// Fast arrivals, small buffer: every condition says wait
    fn busy_inputs() -> FlushInputs {
        FlushInputs {
            wait_millis: 1.0,
            buffer_len: 2,
            lost_millis: 0.0,
            total_items_sent: 10_000.0,
            elapsed_millis: 100.0,
            estimate: LatencyEstimate {
                latency_millis: 1.0,
                per_item_millis: 0.1,
            },
            draining: false,
        }
    }

    #[test]
    fn test_busy_stream_waits() {
        let eval = evaluate(&busy_inputs(), CEILING, NextAvgFormula::Reference);

        assert!((eval.lost_millis - 1.0).abs() < 1e-9);
        assert!((eval.ideal_items_per_millis - 100.0).abs() < 1e-9);
        assert!((eval.longest_send_millis - 2.2).abs() < 1e-9);
        assert!((eval.avg_item_millis - 1.1).abs() < 1e-9);
        assert!((eval.next_longest_send_millis - 13.2).abs() < 1e-9);
        assert!((eval.next_avg_item_millis - 2.2 / 102.0).abs() < 1e-12);
        assert_eq!(eval.reasons, FlushReasons::default());
        assert!(!eval.should_flush());
    }

    #[test]
    fn test_reference_and_corrected_formulas_diverge() {
        // The reference formula divides the current longest send time by the
        // projected size; the corrected one uses the projected send time.
        // On this input only the corrected model flushes.
        let reference = evaluate(&busy_inputs(), CEILING, NextAvgFormula::Reference);
        let corrected = evaluate(&busy_inputs(), CEILING, NextAvgFormula::Corrected);

        assert!((corrected.next_avg_item_millis - 13.2 / 102.0).abs() < 1e-12);
        assert!(!reference.reasons.marginal_gain);
        assert!(corrected.reasons.marginal_gain);
        assert!(corrected.should_flush());
        assert_eq!(corrected.reasons.primary(), "marginal_gain");
    }

    #[test]
    fn test_single_slow_item_hits_ceiling() {
        // probe = 50ms: latency 45, per item 5, one item after one tick
        let inputs = FlushInputs {
            wait_millis: 45.0,
            buffer_len: 1,
            lost_millis: 0.0,
            total_items_sent: 1.0,
            elapsed_millis: 45.0,
            estimate: LatencyEstimate::from_probe(50.0),
            draining: false,
        };
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert!((eval.longest_send_millis - 95.0).abs() < 1e-9);
        assert!((eval.avg_item_millis - 95.0).abs() < 1e-9);
        assert!(eval.reasons.ceiling);
        assert_eq!(eval.reasons.primary(), "ceiling");
    }

    #[test]
    fn test_slow_arrivals_flush() {
        let mut inputs = busy_inputs();
        // one item every 10ms against a 1ms cadence
        inputs.total_items_sent = 10.0;
        inputs.elapsed_millis = 100.0;
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert!((eval.ideal_millis_per_item - 10.0).abs() < 1e-9);
        assert!(eval.reasons.arrival_slower);
    }

    #[test]
    fn test_accumulated_lost_time_forces_ceiling() {
        let mut inputs = busy_inputs();
        inputs.lost_millis = 20.0;
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert!((eval.lost_millis - 21.0).abs() < 1e-9);
        assert!(eval.reasons.ceiling);
    }

    #[test]
    fn test_draining_always_flushes() {
        let mut inputs = busy_inputs();
        inputs.draining = true;
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert!(eval.should_flush());
        assert_eq!(eval.reasons.primary(), "draining");
    }

    #[test]
    fn test_zero_elapsed_is_finite() {
        let mut inputs = busy_inputs();
        inputs.elapsed_millis = 0.0;
        inputs.total_items_sent = 0.0;
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert_eq!(eval.ideal_items_per_millis, 0.0);
        assert!(eval.ideal_millis_per_item.is_finite());
        assert!(eval.reasons.arrival_slower);
    }

    #[test]
    fn test_zero_estimate_is_finite() {
        let inputs = FlushInputs {
            wait_millis: 0.0,
            buffer_len: 3,
            lost_millis: 0.0,
            total_items_sent: 3.0,
            elapsed_millis: 1.0,
            estimate: LatencyEstimate::default(),
            draining: false,
        };
        let eval = evaluate(&inputs, CEILING, NextAvgFormula::Reference);

        assert!(eval.items_per_millis.is_finite());
        assert!(eval.next_items_per_millis.is_finite());
    }
}
