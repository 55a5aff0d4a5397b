use std::path::Path;

use tracing::{debug, warn};

use super::{AnalysisInputs, RunControl};
use crate::callable::{classify_counts, CallableParams, PileupCounts};
use crate::coverage::CoverageAccumulator;
use crate::framework::{ContigContext, ContigProcessor};
use crate::genomics::{ContigInfo, PileupRead, PileupSource, ReferenceAccessor};
use crate::intervals::{Interval, IntervalCoalescer, IntervalWriter};
use crate::result::ContigReport;
use crate::AnalysisError;

/// The pileup pass, run contig by contig.
pub(crate) struct PileupPass<'a, I> {
    pub(crate) inputs: &'a I,
    pub(crate) params: &'a CallableParams,
    pub(crate) interval_dir: Option<&'a Path>,
    pub(crate) control: &'a RunControl,
}

impl<I: AnalysisInputs> ContigProcessor for PileupPass<'_, I> {
    type Worker = (I::Pileups, I::Reference);
    type Summary = ContigReport;
    type Error = AnalysisError;

    fn open_worker(&self) -> Result<Self::Worker, AnalysisError> {
        Ok((self.inputs.open_pileups()?, self.inputs.open_reference()?))
    }

    fn process_contig(
        &self,
        worker: &mut Self::Worker,
        context: ContigContext<'_>,
    ) -> Result<ContigReport, AnalysisError> {
        let contig = context.contig;
        if self.control.is_cancelled() {
            return Ok(ContigReport::untouched(contig.clone()));
        }

        let (pileups, reference) = worker;
        let bases = reference.contig_bases(contig)?;
        let writer = self
            .interval_dir
            .map(|dir| IntervalWriter::create(dir, &contig.name))
            .transpose()?;
        debug!(contig = %contig.name, length = contig.length, index = context.index, "walking contig");

        let mut walk = ContigWalk::new(contig, bases, self.params, self.control, writer);
        let columns = pileups.walk_contig(contig)?;
        for column in columns {
            let pileup = column.map_err(|err| walk.decode_error(err.to_string()))?;
            walk.check_column(pileup.position)?;
            while walk.next < pileup.position && !walk.cancelled {
                walk.visit(&[])?;
            }
            if walk.cancelled {
                break;
            }
            walk.visit(&pileup.reads)?;
            if walk.cancelled {
                break;
            }
        }
        while walk.next < contig.length && !walk.cancelled {
            walk.visit(&[])?;
        }

        walk.finish()
    }
}

/// State of one contig traversal.
struct ContigWalk<'a> {
    contig: &'a ContigInfo,
    bases: &'a [u8],
    params: &'a CallableParams,
    control: &'a RunControl,
    accumulator: CoverageAccumulator,
    coalescer: IntervalCoalescer,
    writer: Option<IntervalWriter>,
    next: u64,
    since_check: u64,
    cancelled: bool,
}

impl<'a> ContigWalk<'a> {
    fn new(
        contig: &'a ContigInfo,
        bases: &'a [u8],
        params: &'a CallableParams,
        control: &'a RunControl,
        writer: Option<IntervalWriter>,
    ) -> Self {
        Self {
            contig,
            bases,
            params,
            control,
            accumulator: CoverageAccumulator::new(),
            coalescer: IntervalCoalescer::new(contig.name.clone()),
            writer,
            next: 0,
            since_check: 0,
            cancelled: false,
        }
    }

    /// Last processed position, 1-based.
    fn last_processed(&self) -> Option<u64> {
        (self.next > 0).then_some(self.next)
    }

    fn decode_error(&self, message: String) -> AnalysisError {
        AnalysisError::Decode {
            contig: self.contig.name.to_string(),
            position: self.last_processed(),
            message,
        }
    }

    fn check_column(&self, position: u64) -> Result<(), AnalysisError> {
        if position < self.next {
            return Err(self.decode_error(format!("column at {} arrived out of order", position + 1)));
        }
        if position >= self.contig.length {
            return Err(self.decode_error(format!(
                "column at {} lies beyond contig end {}",
                position + 1,
                self.contig.length
            )));
        }
        Ok(())
    }

    fn visit(&mut self, reads: &[PileupRead]) -> Result<(), AnalysisError> {
        let position = self.next;
        let counts = PileupCounts::tally(reads, self.params);
        let state = classify_counts(self.bases[position as usize], &counts, self.params);
        self.accumulator.observe(state, counts.qc_depth);
        if let Some(interval) = self.coalescer.push(position, state)? {
            self.write(&interval)?;
        }

        self.next += 1;
        self.since_check += 1;
        if self.since_check == self.control.check_interval() {
            self.since_check = 0;
            self.cancelled = self.control.checkpoint(&self.contig.name, self.control.check_interval());
        }
        Ok(())
    }

    fn write(&mut self, interval: &Interval) -> Result<(), AnalysisError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write(interval)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ContigReport, AnalysisError> {
        if let Some(interval) = self.coalescer.finish() {
            self.write(&interval)?;
        }
        let interval_file = self.writer.map(IntervalWriter::finish).transpose()?;
        self.control.contig_done(&self.contig.name, self.since_check);

        let report = ContigReport {
            contig: self.contig.clone(),
            accumulator: self.accumulator,
            intervals: self.coalescer.emitted(),
            interval_file,
            last_position: self.next.checked_sub(1),
        };
        if self.cancelled && !report.is_complete() {
            warn!(
                contig = %self.contig.name,
                visited = report.accumulator.positions(),
                length = self.contig.length,
                "contig traversal cancelled"
            );
        } else {
            debug!(
                contig = %self.contig.name,
                positions = report.accumulator.positions(),
                intervals = report.intervals,
                mean_depth = report.accumulator.depth_stats().mean(),
                "contig finished"
            );
        }
        Ok(report)
    }
}
