//! Immutable analysis results and the header-ordered merge that builds them.

mod aggregator;
mod types;

pub use aggregator::{ContigReport, InvariantViolation, ResultAggregator};
pub use types::{AnalysisOutcome, ContigSummary, CoverageCallableResult, PartialResult};
