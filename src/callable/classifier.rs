use thiserror::Error;

use super::CallableState;
use crate::genomics::{Pileup, PileupRead};

/// Thresholds driving callable-state classification.
///
/// Defaults reproduce the legacy CallableLoci tool so that reported base
/// counts stay comparable across tool generations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct CallableParams {
    /// Minimum QC-passing depth for a position to be callable.
    pub min_depth: u32,
    /// Minimum mapping quality for a read to count towards QC depth.
    pub min_mapping_quality: u8,
    /// Minimum base quality for a read to count towards QC depth.
    pub min_base_quality: u8,
    /// Reads with mapping quality at or below this value are "low MAPQ".
    pub max_low_mapq: u8,
    /// Maximum tolerated fraction of low-MAPQ reads over raw depth.
    pub max_fraction_low_mapq: f64,
    /// Upper bound on QC-passing depth; `None` disables the check.
    pub max_depth: Option<u32>,
}

impl Default for CallableParams {
    fn default() -> Self {
        Self {
            min_depth: 4,
            min_mapping_quality: 10,
            min_base_quality: 20,
            max_low_mapq: 1,
            max_fraction_low_mapq: 0.1,
            max_depth: None,
        }
    }
}

/// Invalid classifier parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    /// Fraction outside `[0, 1]` or not a number.
    #[error("max fraction of low-MAPQ reads must lie in [0, 1], got {0}")]
    InvalidFraction(f64),

    /// `max_depth` below `min_depth` would make every covered position non-callable.
    #[error("max depth {max_depth} is below min depth {min_depth}")]
    DepthBoundsInverted {
        /// Configured minimum depth.
        min_depth: u32,
        /// Configured maximum depth.
        max_depth: u32,
    },
}

impl CallableParams {
    /// Set the minimum QC-passing depth.
    pub fn with_min_depth(mut self, min_depth: u32) -> Self {
        self.min_depth = min_depth;
        self
    }

    /// Set the minimum mapping quality for QC-passing reads.
    pub fn with_min_mapping_quality(mut self, quality: u8) -> Self {
        self.min_mapping_quality = quality;
        self
    }

    /// Set the minimum base quality for QC-passing reads.
    pub fn with_min_base_quality(mut self, quality: u8) -> Self {
        self.min_base_quality = quality;
        self
    }

    /// Set the low-MAPQ cutoff.
    pub fn with_max_low_mapq(mut self, quality: u8) -> Self {
        self.max_low_mapq = quality;
        self
    }

    /// Set the tolerated low-MAPQ fraction.
    pub fn with_max_fraction_low_mapq(mut self, fraction: f64) -> Self {
        self.max_fraction_low_mapq = fraction;
        self
    }

    /// Set (or clear) the excessive-coverage bound.
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let fraction = self.max_fraction_low_mapq;
        if !(0.0..=1.0).contains(&fraction) {
            // NaN fails `contains` as well
            return Err(ClassifierError::InvalidFraction(fraction));
        }
        if let Some(max_depth) = self.max_depth {
            if max_depth < self.min_depth {
                return Err(ClassifierError::DepthBoundsInverted {
                    min_depth: self.min_depth,
                    max_depth,
                });
            }
        }
        Ok(())
    }
}

/// Read tallies for one pileup column under a parameter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PileupCounts {
    /// All overlapping reads.
    pub raw_depth: u32,
    /// Reads passing both mapping- and base-quality thresholds.
    pub qc_depth: u32,
    /// Reads with mapping quality `<= max_low_mapq`.
    pub low_mapq: u32,
}

impl PileupCounts {
    /// Tally the reads of a column.
    ///
    /// Deleted bases have no quality and pass the base-quality test; their
    /// mapping quality is still checked.
    pub fn tally(reads: &[PileupRead], params: &CallableParams) -> Self {
        let mut counts = Self::default();
        for read in reads {
            counts.raw_depth += 1;
            if read.mapping_quality <= params.max_low_mapq {
                counts.low_mapq += 1;
            }
            let base_ok = read
                .base_quality
                .map_or(true, |quality| quality >= params.min_base_quality);
            if read.mapping_quality >= params.min_mapping_quality && base_ok {
                counts.qc_depth += 1;
            }
        }
        counts
    }
}

/// Classify a pileup column.
pub fn classify(ref_base: u8, pileup: &Pileup, params: &CallableParams) -> CallableState {
    classify_counts(ref_base, &PileupCounts::tally(&pileup.reads, params), params)
}

/// Classify from pre-computed tallies; the first failing rule wins.
///
/// The low-MAPQ fraction is taken over raw depth, not QC depth; reported base
/// counts of earlier tooling depend on it.
pub fn classify_counts(ref_base: u8, counts: &PileupCounts, params: &CallableParams) -> CallableState {
    if matches!(ref_base, b'N' | b'n') {
        return CallableState::RefN;
    }
    if counts.raw_depth == 0 {
        return CallableState::NoCoverage;
    }
    let low_mapq_fraction = counts.low_mapq as f64 / counts.raw_depth as f64;
    if low_mapq_fraction > params.max_fraction_low_mapq {
        return CallableState::PoorMappingQuality;
    }
    if counts.qc_depth < params.min_depth {
        return CallableState::LowCoverage;
    }
    if let Some(max_depth) = params.max_depth {
        if counts.qc_depth > max_depth {
            return CallableState::ExcessiveCoverage;
        }
    }
    CallableState::Callable
}
