use rayon::prelude::*;
use thiserror::Error;

use crate::genomics::ContigInfo;

/// Errors raised by the evaluator itself (not by processors).
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Configuration invalid (e.g., zero threads).
    #[error("invalid evaluator configuration: {0}")]
    InvalidConfiguration(String),

    /// Worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Scheduling parameters for contig evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Worker threads; 1 runs everything on the calling thread.
    pub threads: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl EvaluatorConfig {
    /// Construct configuration with an explicit thread count.
    pub fn with_threads(threads: usize) -> Result<Self, FrameworkError> {
        if threads == 0 {
            return Err(FrameworkError::InvalidConfiguration(
                "thread count must be > 0".to_string(),
            ));
        }
        Ok(Self { threads })
    }
}

/// Per-contig metadata supplied to processors.
#[derive(Debug, Clone, Copy)]
pub struct ContigContext<'a> {
    /// Position of the contig in header order.
    pub index: usize,
    /// The contig being processed.
    pub contig: &'a ContigInfo,
}

/// Trait implemented by analyses that run independently per contig.
///
/// A worker owns whatever non-shareable handles (file readers, caches) the
/// processor needs; each thread opens its own.
pub trait ContigProcessor: Sync {
    /// Thread-private state.
    type Worker;
    /// Result of one contig.
    type Summary: Send;
    /// Processor error.
    type Error: Send + From<FrameworkError>;

    /// Open the handles a worker needs.
    fn open_worker(&self) -> Result<Self::Worker, Self::Error>;

    /// Process one contig.
    fn process_contig(
        &self,
        worker: &mut Self::Worker,
        context: ContigContext<'_>,
    ) -> Result<Self::Summary, Self::Error>;
}

/// Runs a [`ContigProcessor`] over contigs and returns summaries in input order.
#[derive(Debug, Clone, Default)]
pub struct ContigEvaluator {
    config: EvaluatorConfig,
}

impl ContigEvaluator {
    /// Create an evaluator.
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Access configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate every contig.
    ///
    /// Summaries come back in the order of `contigs` whatever the completion
    /// order; with several failures the first one in that order is returned.
    pub fn evaluate<P: ContigProcessor>(
        &self,
        processor: &P,
        contigs: &[ContigInfo],
    ) -> Result<Vec<P::Summary>, P::Error> {
        if self.config.threads <= 1 || contigs.len() <= 1 {
            return self.evaluate_sequential(processor, contigs);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|err| FrameworkError::ThreadPool(err.to_string()))?;

        let results: Vec<Result<P::Summary, P::Error>> = pool.install(|| {
            contigs
                .par_iter()
                .enumerate()
                .map_init(
                    || None,
                    |worker: &mut Option<P::Worker>, (index, contig)| {
                        let worker = match worker {
                            Some(worker) => worker,
                            slot @ None => slot.insert(processor.open_worker()?),
                        };
                        processor.process_contig(worker, ContigContext { index, contig })
                    },
                )
                .collect()
        });

        results.into_iter().collect()
    }

    fn evaluate_sequential<P: ContigProcessor>(
        &self,
        processor: &P,
        contigs: &[ContigInfo],
    ) -> Result<Vec<P::Summary>, P::Error> {
        let mut worker = processor.open_worker()?;
        contigs
            .iter()
            .enumerate()
            .map(|(index, contig)| processor.process_contig(&mut worker, ContigContext { index, contig }))
            .collect()
    }
}
