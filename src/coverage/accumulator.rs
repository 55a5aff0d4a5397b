use super::{DepthHistogram, RunningStats, STANDARD_DEPTH_THRESHOLDS};
use crate::callable::{CallableCounts, CallableState};

/// Per-scope coverage and callable-state accumulation.
///
/// One instance is owned by a contig traversal; the genome-wide instance is
/// built only by merging flushed contig accumulators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageAccumulator {
    histogram: DepthHistogram,
    depth: RunningStats,
    callable: CallableCounts,
}

impl CoverageAccumulator {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position's classification and depth.
    pub fn observe(&mut self, state: CallableState, depth: u32) {
        self.histogram.observe(depth);
        self.depth.push(depth as f64);
        self.callable.increment(state);
    }

    /// Fold a flushed accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.histogram.merge(&other.histogram);
        self.depth.merge(&other.depth);
        self.callable.merge(&other.callable);
    }

    /// Positions observed.
    pub fn positions(&self) -> u64 {
        self.depth.count()
    }

    /// Depth histogram.
    pub fn histogram(&self) -> &DepthHistogram {
        &self.histogram
    }

    /// Running depth statistics.
    pub fn depth_stats(&self) -> &RunningStats {
        &self.depth
    }

    /// Callable-state counters.
    pub fn callable(&self) -> &CallableCounts {
        &self.callable
    }

    /// Check that counters and histogram agree on the number of positions.
    pub fn is_consistent(&self) -> bool {
        let positions = self.positions();
        self.callable.total() == positions && self.histogram.total() == positions
    }

    /// Derive the reportable coverage summary.
    pub fn summarize(&self) -> CoverageSummary {
        CoverageSummary {
            positions: self.positions(),
            covered_positions: self.histogram.covered(),
            mean: self.depth.mean(),
            median: self.histogram.median(),
            stddev: self.depth.stddev(),
            fraction_at: STANDARD_DEPTH_THRESHOLDS
                .iter()
                .map(|&depth| DepthFraction {
                    depth,
                    fraction: self.histogram.fraction_at_least(depth),
                })
                .collect(),
            histogram: self.histogram.clone(),
        }
    }
}

/// Fraction of positions at or above a depth.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct DepthFraction {
    /// Depth threshold.
    pub depth: u32,
    /// Fraction in `[0, 1]`.
    pub fraction: f64,
}

/// Coverage statistics of one scope (a contig or the genome).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct CoverageSummary {
    /// Positions visited.
    pub positions: u64,
    /// Positions with non-zero depth.
    pub covered_positions: u64,
    /// Mean depth.
    pub mean: f64,
    /// Lower median depth (from the histogram).
    pub median: u32,
    /// Sample standard deviation of depth.
    pub stddev: f64,
    /// Fractions for [`STANDARD_DEPTH_THRESHOLDS`].
    pub fraction_at: Vec<DepthFraction>,
    /// Depth histogram.
    pub histogram: DepthHistogram,
}

impl CoverageSummary {
    /// Fraction at `>= depth`, computed from the histogram; thresholds above
    /// [`MAX_DEPTH_BIN`](super::MAX_DEPTH_BIN) read the saturated top bin.
    pub fn fraction_at_least(&self, depth: u32) -> f64 {
        self.histogram.fraction_at_least(depth)
    }
}
