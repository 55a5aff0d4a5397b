use tracing::{debug, info};

use std::collections::HashMap;

use super::{AnalysisInputs, CancellationToken, PileupPass, ProgressCallback, RunControl};
use crate::framework::{ContigEvaluator, EvaluatorConfig};
use crate::genomics::{ContigInfo, ReadLevelCollector, ReadStats, SourceError};
use crate::intervals::interval_file_name;
use crate::result::{AnalysisOutcome, ContigReport, ResultAggregator};
use crate::{AnalysisConfig, AnalysisError};

/// Runs the read-level and pileup passes over one set of inputs.
pub struct CallableLociAnalyzer<I> {
    inputs: I,
    config: AnalysisConfig,
    contigs: Vec<ContigInfo>,
    token: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl<I: std::fmt::Debug> std::fmt::Debug for CallableLociAnalyzer<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableLociAnalyzer")
            .field("inputs", &self.inputs)
            .field("config", &self.config)
            .field("contigs", &self.contigs.len())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Header contigs restricted to `subset`, keeping header order.
fn select_contigs(header: &[ContigInfo], subset: Option<&[String]>) -> Result<Vec<ContigInfo>, AnalysisError> {
    let Some(subset) = subset else {
        return Ok(header.to_vec());
    };
    if let Some(unknown) = subset
        .iter()
        .find(|name| !header.iter().any(|contig| &*contig.name == name.as_str()))
    {
        return Err(AnalysisError::Configuration(format!(
            "contig {unknown} is not declared in the alignment header"
        )));
    }
    Ok(header
        .iter()
        .filter(|contig| subset.iter().any(|name| name.as_str() == &*contig.name))
        .cloned()
        .collect())
}

/// Rejects contigs whose interval files would share a name.
fn check_interval_file_names(contigs: &[ContigInfo]) -> Result<(), AnalysisError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for contig in contigs {
        if let Some(other) = seen.insert(interval_file_name(&contig.name), &*contig.name) {
            return Err(AnalysisError::Configuration(format!(
                "contigs {other} and {} would both write {}",
                contig.name,
                interval_file_name(&contig.name)
            )));
        }
    }
    Ok(())
}

impl<I: AnalysisInputs> CallableLociAnalyzer<I> {
    /// Validate the configuration against the inputs.
    pub fn new(inputs: I, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let contigs = select_contigs(inputs.contigs(), config.contigs.as_deref())?;
        if config.interval_dir.is_some() {
            check_interval_file_names(&contigs)?;
        }
        Ok(Self {
            inputs,
            config,
            contigs,
            token: CancellationToken::new(),
            progress: None,
        })
    }

    /// Observe cancellation through `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Report progress to `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Contigs that will be analyzed, in header order.
    pub fn contigs(&self) -> &[ContigInfo] {
        &self.contigs
    }

    /// Configuration in effect.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the analysis.
    ///
    /// Cancellation is not an error: it yields [`AnalysisOutcome::Cancelled`]
    /// with the statistics of every position visited so far.
    pub fn run(&self) -> Result<AnalysisOutcome, AnalysisError> {
        let total: u64 = self.contigs.iter().map(|contig| contig.length).sum();
        info!(
            contigs = self.contigs.len(),
            positions = total,
            threads = self.config.threads,
            read_stats = self.config.collect_read_stats,
            "starting analysis"
        );

        let (reads, reports) = match (self.config.collect_read_stats, self.config.concurrent_passes) {
            (false, _) => (None, self.pileup_pass(total)?),
            (true, false) => {
                let reads = self.read_pass()?;
                (Some(reads), self.pileup_pass(total)?)
            }
            (true, true) => {
                let (reads, reports) = rayon::join(|| self.read_pass(), || self.pileup_pass(total));
                (Some(reads?), reports?)
            }
        };

        let cancelled = self.token.is_cancelled()
            && (reads.as_ref().map_or(false, |(_, complete)| !complete)
                || reports.iter().any(|report| !report.is_complete()));

        let mut aggregator = ResultAggregator::new(self.config.params.clone());
        for report in reports {
            aggregator.add(report)?;
        }
        let reads = reads.map(|(stats, _)| stats);

        if cancelled {
            let partial = aggregator.finish_partial(reads)?;
            info!(
                positions = partial.result().positions(),
                last = %partial.last_locus().map(ToString::to_string).unwrap_or_default(),
                "analysis cancelled"
            );
            return Ok(AnalysisOutcome::Cancelled(partial));
        }

        let result = aggregator.finish(reads)?;
        info!(
            positions = result.positions(),
            mean_depth = result.coverage().mean,
            callable = result.callable().get(crate::CallableState::Callable),
            "analysis complete"
        );
        Ok(AnalysisOutcome::Complete(result))
    }

    /// Run only the read-level pass.
    ///
    /// When cancelled, the figures cover the records read so far.
    pub fn run_read_pass(&self) -> Result<ReadStats, AnalysisError> {
        self.read_pass().map(|(stats, _)| stats)
    }

    fn read_pass(&self) -> Result<(ReadStats, bool), AnalysisError> {
        let mut collector = ReadLevelCollector::new(self.config.insert_size);
        let interval = self.config.check_interval;
        let mut complete = true;
        let mut last_locus = None;
        for read in self.inputs.open_reads()? {
            let read = read.map_err(|err| self.read_error(last_locus, err))?;
            if read.locus.is_some() {
                last_locus = read.locus;
            }
            collector.observe(&read);
            if collector.total() % interval == 0 && self.token.is_cancelled() {
                complete = false;
                break;
            }
        }
        debug!(records = collector.total(), complete, "read pass finished");
        Ok((collector.finish(), complete))
    }

    /// Decode failures name the last placed record read successfully.
    fn read_error(&self, last_locus: Option<(u32, u64)>, err: SourceError) -> AnalysisError {
        let message = match err {
            SourceError::Decode(message) => message,
            other => return AnalysisError::Alignment(other),
        };
        let contig = last_locus.and_then(|(tid, _)| {
            self.inputs
                .contigs()
                .iter()
                .find(|contig| contig.tid == tid)
                .map(|contig| contig.name.to_string())
        });
        match (contig, last_locus) {
            (Some(contig), Some((_, position))) => AnalysisError::Decode {
                contig,
                position: Some(position + 1),
                message,
            },
            _ => AnalysisError::Decode {
                contig: "*".to_string(),
                position: None,
                message,
            },
        }
    }

    fn pileup_pass(&self, total: u64) -> Result<Vec<ContigReport>, AnalysisError> {
        let control = RunControl::new(
            self.token.clone(),
            self.progress.clone(),
            total,
            self.config.check_interval,
        );
        let pass = PileupPass {
            inputs: &self.inputs,
            params: &self.config.params,
            interval_dir: self.config.interval_dir.as_deref(),
            control: &control,
        };
        let evaluator = ContigEvaluator::new(EvaluatorConfig {
            threads: self.config.threads,
        });
        let reports = evaluator.evaluate(&pass, &self.contigs)?;
        debug!(processed = control.processed(), "pileup pass finished");
        Ok(reports)
    }
}
