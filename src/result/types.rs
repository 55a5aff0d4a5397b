use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::callable::{CallableCounts, CallableParams};
use crate::coverage::CoverageSummary;
use crate::genomics::{Locus, ReadStats};

/// Coverage and callable figures of one contig.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ContigSummary {
    /// Contig name.
    #[cfg_attr(
        feature = "visualize",
        serde(serialize_with = "crate::genomics::serialize_arc_str")
    )]
    pub name: Arc<str>,
    /// Declared length.
    pub length: u64,
    /// Coverage statistics over the visited positions.
    pub coverage: CoverageSummary,
    /// Positions per callable state.
    pub callable: CallableCounts,
    /// Number of coalesced intervals.
    pub intervals: u64,
    /// Interval TSV written for this contig, if any.
    pub interval_file: Option<PathBuf>,
    /// Whether every position of the contig was visited.
    pub complete: bool,
}

/// Final, immutable output of an analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct CoverageCallableResult {
    params: CallableParams,
    coverage: CoverageSummary,
    callable: CallableCounts,
    contigs: Vec<ContigSummary>,
    reads: Option<ReadStats>,
}

impl CoverageCallableResult {
    pub(crate) fn new(
        params: CallableParams,
        coverage: CoverageSummary,
        callable: CallableCounts,
        contigs: Vec<ContigSummary>,
        reads: Option<ReadStats>,
    ) -> Self {
        Self {
            params,
            coverage,
            callable,
            contigs,
            reads,
        }
    }

    /// Parameters the classification ran with.
    pub fn params(&self) -> &CallableParams {
        &self.params
    }

    /// Genome-wide coverage statistics.
    pub fn coverage(&self) -> &CoverageSummary {
        &self.coverage
    }

    /// Genome-wide callable-state counts.
    pub fn callable(&self) -> &CallableCounts {
        &self.callable
    }

    /// Per-contig summaries in header order.
    pub fn contigs(&self) -> &[ContigSummary] {
        &self.contigs
    }

    /// Summary of the contig called `name`.
    pub fn contig(&self, name: &str) -> Option<&ContigSummary> {
        self.contigs.iter().find(|contig| &*contig.name == name)
    }

    /// Read-level statistics, when that pass ran.
    pub fn read_stats(&self) -> Option<&ReadStats> {
        self.reads.as_ref()
    }

    /// Interval files written, in header order.
    pub fn interval_files(&self) -> impl Iterator<Item = &Path> {
        self.contigs
            .iter()
            .filter_map(|contig| contig.interval_file.as_deref())
    }

    /// Positions classified across all contigs.
    pub fn positions(&self) -> u64 {
        self.coverage.positions
    }

    /// Whether every selected contig was fully traversed.
    pub fn is_complete(&self) -> bool {
        self.contigs.iter().all(|contig| contig.complete)
    }
}

/// Result of a cancelled analysis.
///
/// Only the statistics of positions visited before cancellation are included;
/// they satisfy the same partition and conservation rules as a full result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct PartialResult {
    result: CoverageCallableResult,
    last_locus: Option<Locus>,
}

impl PartialResult {
    pub(crate) fn new(result: CoverageCallableResult, last_locus: Option<Locus>) -> Self {
        Self { result, last_locus }
    }

    /// Statistics gathered before cancellation.
    pub fn result(&self) -> &CoverageCallableResult {
        &self.result
    }

    /// Last position processed in header order, if any.
    pub fn last_locus(&self) -> Option<&Locus> {
        self.last_locus.as_ref()
    }

    /// Take the inner result.
    pub fn into_result(self) -> CoverageCallableResult {
        self.result
    }
}

/// How an analysis ended.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub enum AnalysisOutcome {
    /// Every selected contig was processed.
    Complete(CoverageCallableResult),
    /// The cancellation token fired first.
    Cancelled(PartialResult),
}

impl AnalysisOutcome {
    /// Whether the run finished.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    /// Result of either variant.
    pub fn result(&self) -> &CoverageCallableResult {
        match self {
            Self::Complete(result) => result,
            Self::Cancelled(partial) => partial.result(),
        }
    }

    /// The complete result, or `None` when cancelled.
    pub fn into_complete(self) -> Option<CoverageCallableResult> {
        match self {
            Self::Complete(result) => Some(result),
            Self::Cancelled(_) => None,
        }
    }
}
