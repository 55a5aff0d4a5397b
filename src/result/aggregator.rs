use std::path::PathBuf;

use thiserror::Error;

use super::{ContigSummary, CoverageCallableResult, PartialResult};
use crate::callable::CallableParams;
use crate::coverage::{CoverageAccumulator, DepthHistogram};
use crate::genomics::{ContigInfo, Locus, ReadStats};

/// Accumulators disagree with each other.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invariant violated for {scope}: {message}")]
pub struct InvariantViolation {
    /// Contig name, or `genome`.
    pub scope: String,
    /// What did not add up.
    pub message: String,
}

/// Everything a contig traversal hands to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct ContigReport {
    /// The traversed contig.
    pub contig: ContigInfo,
    /// Statistics of the visited positions.
    pub accumulator: CoverageAccumulator,
    /// Intervals emitted by the coalescer.
    pub intervals: u64,
    /// Interval file, when intervals were written.
    pub interval_file: Option<PathBuf>,
    /// Last visited 0-based position.
    pub last_position: Option<u64>,
}

impl ContigReport {
    /// Report of a contig that was never started.
    pub fn untouched(contig: ContigInfo) -> Self {
        Self {
            contig,
            accumulator: CoverageAccumulator::new(),
            intervals: 0,
            interval_file: None,
            last_position: None,
        }
    }

    /// Whether every position was visited.
    pub fn is_complete(&self) -> bool {
        self.accumulator.positions() == self.contig.length
    }
}

/// Merges contig reports, in the order they are added, into one result.
#[derive(Debug)]
pub struct ResultAggregator {
    params: CallableParams,
    genome: CoverageAccumulator,
    contigs: Vec<ContigSummary>,
    last_locus: Option<Locus>,
}

impl ResultAggregator {
    /// Start an empty aggregation.
    pub fn new(params: CallableParams) -> Self {
        Self {
            params,
            genome: CoverageAccumulator::new(),
            contigs: Vec::new(),
            last_locus: None,
        }
    }

    /// Flush one contig report into the genome totals.
    pub fn add(&mut self, report: ContigReport) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation {
            scope: report.contig.name.to_string(),
            message,
        };
        let positions = report.accumulator.positions();

        if !report.accumulator.is_consistent() {
            return Err(violation(format!(
                "{positions} positions but {} classified and {} in histogram",
                report.accumulator.callable().total(),
                report.accumulator.histogram().total()
            )));
        }
        if positions > report.contig.length {
            return Err(violation(format!(
                "{positions} positions visited on a contig of length {}",
                report.contig.length
            )));
        }
        if report.intervals > positions || (positions > 0 && report.intervals == 0) {
            return Err(violation(format!(
                "{} intervals for {positions} positions",
                report.intervals
            )));
        }

        self.genome.merge(&report.accumulator);
        if let Some(position) = report.last_position {
            self.last_locus = Some(Locus::new(report.contig.name.clone(), position));
        }

        let complete = report.is_complete();
        self.contigs.push(ContigSummary {
            name: report.contig.name,
            length: report.contig.length,
            coverage: report.accumulator.summarize(),
            callable: *report.accumulator.callable(),
            intervals: report.intervals,
            interval_file: report.interval_file,
            complete,
        });
        Ok(())
    }

    /// Contigs added so far.
    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }

    /// Build the final result.
    pub fn finish(self, reads: Option<ReadStats>) -> Result<CoverageCallableResult, InvariantViolation> {
        self.check_genome()?;
        Ok(CoverageCallableResult::new(
            self.params,
            self.genome.summarize(),
            *self.genome.callable(),
            self.contigs,
            reads,
        ))
    }

    /// Build the result of a cancelled run.
    pub fn finish_partial(self, reads: Option<ReadStats>) -> Result<PartialResult, InvariantViolation> {
        let last_locus = self.last_locus.clone();
        let result = self.finish(reads)?;
        Ok(PartialResult::new(result, last_locus))
    }

    fn check_genome(&self) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation {
            scope: "genome".to_string(),
            message,
        };
        if !self.genome.is_consistent() {
            return Err(violation("counters and histogram disagree".to_string()));
        }
        let contig_positions: u64 = self.contigs.iter().map(|contig| contig.coverage.positions).sum();
        if contig_positions != self.genome.positions() {
            return Err(violation(format!(
                "contigs sum to {contig_positions} positions, genome holds {}",
                self.genome.positions()
            )));
        }
        let mut contig_bins = DepthHistogram::new();
        for contig in &self.contigs {
            contig_bins.merge(&contig.coverage.histogram);
        }
        if let Some(depth) = contig_bins
            .bins()
            .iter()
            .zip(self.genome.histogram().bins())
            .position(|(contigs, genome)| contigs != genome)
        {
            return Err(violation(format!(
                "depth bin {depth} holds {} across contigs but {} in the genome histogram",
                contig_bins.bins()[depth],
                self.genome.histogram().bins()[depth]
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallableState;

    fn report(name: &str, length: u64, depths: &[(CallableState, u32)], intervals: u64) -> ContigReport {
        let mut accumulator = CoverageAccumulator::new();
        for &(state, depth) in depths {
            accumulator.observe(state, depth);
        }
        ContigReport {
            contig: ContigInfo::new(0, name, length),
            accumulator,
            intervals,
            interval_file: None,
            last_position: depths.len().checked_sub(1).map(|p| p as u64),
        }
    }

    #[test]
    fn genome_totals_are_sum_of_contigs() {
        let mut aggregator = ResultAggregator::new(CallableParams::default());
        aggregator
            .add(report(
                "chr1",
                3,
                &[
                    (CallableState::Callable, 10),
                    (CallableState::Callable, 12),
                    (CallableState::LowCoverage, 2),
                ],
                2,
            ))
            .unwrap();
        aggregator
            .add(report("chr2", 1, &[(CallableState::NoCoverage, 0)], 1))
            .unwrap();
        aggregator.add(ContigReport::untouched(ContigInfo::new(2, "chrM", 0))).unwrap();

        let result = aggregator.finish(None).unwrap();
        assert_eq!(result.positions(), 4);
        assert_eq!(result.callable().get(CallableState::Callable), 2);
        assert_eq!(result.callable().total(), 4);
        assert_eq!(result.coverage().histogram.total(), 4);
        assert_eq!(result.contigs().len(), 3);
        assert!(result.is_complete());
        assert_eq!(result.contig("chrM").unwrap().coverage.positions, 0);
    }

    #[test]
    fn short_contig_is_flagged_incomplete() {
        let mut aggregator = ResultAggregator::new(CallableParams::default());
        aggregator
            .add(report("chr1", 10, &[(CallableState::Callable, 9)], 1))
            .unwrap();
        let partial = aggregator.finish_partial(None).unwrap();
        assert!(!partial.result().is_complete());
        assert_eq!(partial.last_locus(), Some(&Locus::new("chr1", 0)));
    }

    #[test]
    fn overlong_contig_is_rejected() {
        let mut aggregator = ResultAggregator::new(CallableParams::default());
        let err = aggregator
            .add(report(
                "chr1",
                1,
                &[(CallableState::Callable, 9), (CallableState::Callable, 9)],
                1,
            ))
            .unwrap_err();
        assert_eq!(err.scope, "chr1");
    }

    #[test]
    fn genome_histogram_must_match_contigs_bin_for_bin() {
        let mut aggregator = ResultAggregator::new(CallableParams::default());
        aggregator
            .add(report("chr1", 2, &[(CallableState::Callable, 10), (CallableState::Callable, 12)], 1))
            .unwrap();
        assert!(aggregator.check_genome().is_ok());

        // same position total, different depth distribution
        let mut skewed = CoverageAccumulator::new();
        skewed.observe(CallableState::Callable, 10);
        skewed.observe(CallableState::Callable, 10);
        aggregator.genome = skewed;

        let err = aggregator.finish(None).unwrap_err();
        assert_eq!(err.scope, "genome");
        assert!(err.message.contains("depth bin 10"));
    }

    #[test]
    fn missing_intervals_are_rejected() {
        let mut aggregator = ResultAggregator::new(CallableParams::default());
        assert!(aggregator
            .add(report("chr1", 1, &[(CallableState::Callable, 9)], 0))
            .is_err());
    }
}
