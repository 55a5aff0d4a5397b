//! Depth histograms and running coverage statistics.

mod accumulator;
mod histogram;
mod statistics;

pub use accumulator::{CoverageAccumulator, CoverageSummary, DepthFraction};
pub use histogram::{DepthHistogram, MAX_DEPTH_BIN, STANDARD_DEPTH_THRESHOLDS};
pub use statistics::RunningStats;
