//! # Streaming Coverage and Callable-Loci Analysis
//!
//! This library walks the pileup of an indexed BAM/CRAM file once and, from
//! that single traversal, produces:
//!
//! 1. **Coverage statistics**: genome-wide and per-contig depth histograms
//!    with running mean/stddev, median and fraction-at-depth figures
//! 2. **Callable states**: every reference position is classified as
//!    `REF_N`, `NO_COVERAGE`, `POOR_MAPPING_QUALITY`, `LOW_COVERAGE`,
//!    `EXCESSIVE_COVERAGE` or `CALLABLE`
//! 3. **Intervals**: runs of equal state, optionally written as one TSV per
//!    contig
//!
//! A separate read-level pass gathers alignment-rate, pairing and insert-size
//! figures.
//!
//! Memory stays bounded by the 256-bin histogram, one summary per contig and
//! the reference bases of the contigs currently being walked.
//!
//! ## Usage Example
//!
//! ```ignore
//! use callable_loci::{AnalysisConfig, CallableLociAnalyzer, HtsInputs};
//!
//! let inputs = HtsInputs::open("sample.bam".as_ref(), "hg38.fa".as_ref())?;
//! let config = AnalysisConfig::default().with_threads(4);
//! let outcome = CallableLociAnalyzer::new(inputs, config)?.run()?;
//! println!("{}", outcome.result().coverage().mean);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod callable;   // Callable-state classification
pub mod coverage;   // Depth histograms and running statistics
pub mod engine;     // Pileup and read passes
pub mod framework;  // Per-contig evaluation
pub mod genomics;   // Alignment, reference and read inputs
pub mod intervals;  // Interval coalescing and TSV files
pub mod report;     // Summary and histogram rendering
pub mod result;     // Result types and aggregation

// Re-exports for convenience
pub use callable::{classify, CallableParams, CallableState};
pub use coverage::{CoverageSummary, DepthHistogram, RunningStats};
pub use engine::{
    AnalysisInputs, CallableLociAnalyzer, CancellationToken, HtsInputs, InMemoryInputs,
    ProgressCallback, ReadEntry,
};
pub use genomics::{ContigInfo, InsertSizeConfig, Locus, ReadStats};
pub use intervals::Interval;
pub use result::{AnalysisOutcome, ContigSummary, CoverageCallableResult, PartialResult};

use std::path::PathBuf;

use thiserror::Error;

/// Default number of positions between cancellation checks and progress reports.
pub const DEFAULT_CHECK_INTERVAL: u64 = 1_000_000;

/// Configuration of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Classification thresholds
    pub params: CallableParams,

    /// Directory receiving one interval TSV per contig
    pub interval_dir: Option<PathBuf>,

    /// Contig subset; `None` analyzes every header contig
    pub contigs: Option<Vec<String>>,

    /// Worker threads for the pileup pass
    pub threads: usize,

    /// Run the read-level pass
    pub collect_read_stats: bool,

    /// Run the read-level and pileup passes at the same time
    pub concurrent_passes: bool,

    /// Positions between cancellation checks
    pub check_interval: u64,

    /// Insert-size histogram geometry
    pub insert_size: InsertSizeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            params: CallableParams::default(),
            interval_dir: None,
            contigs: None,
            threads: 1,
            collect_read_stats: true,
            concurrent_passes: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
            insert_size: InsertSizeConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Use the given classification thresholds.
    pub fn with_params(mut self, params: CallableParams) -> Self {
        self.params = params;
        self
    }

    /// Write per-contig interval files into `dir`.
    pub fn with_interval_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.interval_dir = Some(dir.into());
        self
    }

    /// Restrict the analysis to the named contigs.
    pub fn with_contigs<S: Into<String>>(mut self, contigs: impl IntoIterator<Item = S>) -> Self {
        self.contigs = Some(contigs.into_iter().map(Into::into).collect());
        self
    }

    /// Set the worker count of the pileup pass.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable the read-level pass.
    pub fn with_read_stats(mut self, enabled: bool) -> Self {
        self.collect_read_stats = enabled;
        self
    }

    /// Run both passes concurrently.
    pub fn with_concurrent_passes(mut self, enabled: bool) -> Self {
        self.concurrent_passes = enabled;
        self
    }

    /// Positions between cancellation checks and progress reports.
    pub fn with_check_interval(mut self, interval: u64) -> Self {
        self.check_interval = interval;
        self
    }

    /// Insert-size histogram geometry.
    pub fn with_insert_size(mut self, insert_size: InsertSizeConfig) -> Self {
        self.insert_size = insert_size;
        self
    }

    /// Check the configuration before any input is read.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.params.validate()?;
        if self.threads == 0 {
            return Err(AnalysisError::Configuration("thread count must be > 0".to_string()));
        }
        if self.check_interval == 0 {
            return Err(AnalysisError::Configuration("check interval must be > 0".to_string()));
        }
        if self.insert_size.bucket_width == 0 {
            return Err(AnalysisError::Configuration(
                "insert-size bucket width must be > 0".to_string(),
            ));
        }
        if let Some(dir) = &self.interval_dir {
            if !dir.is_dir() {
                return Err(AnalysisError::Configuration(format!(
                    "interval directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur during analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid parameters or inputs
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Classifier thresholds rejected
    #[error("Invalid thresholds: {0}")]
    Params(#[from] callable::ClassifierError),

    /// File missing or unreadable
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Alignment could not be opened or queried
    #[error("Alignment error: {0}")]
    Alignment(#[from] genomics::SourceError),

    /// Malformed alignment data mid-traversal
    #[error("Decode error on {contig} after {}: {message}", describe_position(.position))]
    Decode {
        /// Contig being traversed
        contig: String,
        /// Last successfully processed position (1-based)
        position: Option<u64>,
        /// Backend message
        message: String,
    },

    /// Reference missing a contig or disagreeing with the header
    #[error("Reference error: {0}")]
    Reference(#[from] genomics::ReferenceError),

    /// Interval file could not be written
    #[error("Interval error: {0}")]
    Interval(#[from] intervals::IntervalError),

    /// Accumulators failed a consistency check
    #[error("{0}")]
    InvariantViolation(#[from] result::InvariantViolation),

    /// Worker pool failure
    #[error("Evaluation error: {0}")]
    Framework(#[from] framework::FrameworkError),
}

fn describe_position(position: &Option<u64>) -> String {
    match position {
        Some(position) => format!("position {position}"),
        None => "contig start".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let config = AnalysisConfig::default().with_threads(0);
        assert!(matches!(config.validate(), Err(AnalysisError::Configuration(_))));

        let params = CallableParams::default().with_max_fraction_low_mapq(1.5);
        let config = AnalysisConfig::default().with_params(params);
        assert!(matches!(config.validate(), Err(AnalysisError::Params(_))));

        let config = AnalysisConfig::default().with_interval_dir("/definitely/not/here");
        assert!(config.validate().is_err());
    }

    #[test]
    fn decode_error_names_last_position() {
        let err = AnalysisError::Decode {
            contig: "chr2".to_string(),
            position: Some(1500),
            message: "truncated record".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Decode error on chr2 after position 1500: truncated record"
        );
    }
}
