//! Per-evaluator performance counters.
//!
//! [`EvalMetrics`] accumulates over the lifetime of a [`State`](crate::State)
//! and is read back with [`State::metrics`](crate::State::metrics).

use std::ops::AddAssign;

/// Counters collected for one evaluator.
///
/// Durations are in microseconds and cumulative.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalMetrics {
    /// Number of `evaluate` calls.
    pub evaluations: u64,
    /// Number of `partial_derivative` calls.
    pub derivative_evaluations: u64,
    /// Reads served from cache without recomputation.
    pub cache_hits: u64,
    /// Derivative requests served from cache.
    pub derivative_cache_hits: u64,
    /// Wall-clock time spent in `evaluate`.
    pub evaluate_us: u64,
    /// Wall-clock time spent in `partial_derivative`.
    pub derivative_us: u64,
}

impl AddAssign<&EvalMetrics> for EvalMetrics {
    fn add_assign(&mut self, rhs: &EvalMetrics) {
        self.evaluations += rhs.evaluations;
        self.derivative_evaluations += rhs.derivative_evaluations;
        self.cache_hits += rhs.cache_hits;
        self.derivative_cache_hits += rhs.derivative_cache_hits;
        self.evaluate_us += rhs.evaluate_us;
        self.derivative_us += rhs.derivative_us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = EvalMetrics::default();
        assert_eq!(m.evaluations, 0);
        assert_eq!(m.derivative_evaluations, 0);
        assert_eq!(m.cache_hits, 0);
        assert_eq!(m.derivative_cache_hits, 0);
        assert_eq!(m.evaluate_us, 0);
        assert_eq!(m.derivative_us, 0);
    }

    #[test]
    fn totals_accumulate() {
        let a = EvalMetrics {
            evaluations: 2,
            cache_hits: 5,
            evaluate_us: 40,
            ..Default::default()
        };
        let mut total = EvalMetrics::default();
        total += &a;
        total += &a;
        assert_eq!(total.evaluations, 4);
        assert_eq!(total.cache_hits, 10);
        assert_eq!(total.evaluate_us, 80);
    }
}
