use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Usability class assigned to a single reference position.
///
/// Variants are declared in the order the classifier evaluates them, so the
/// derived ordering doubles as rule precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub enum CallableState {
    /// Reference base is `N`.
    RefN,
    /// No reads overlap the position.
    NoCoverage,
    /// Too many overlapping reads have near-zero mapping quality.
    PoorMappingQuality,
    /// Fewer QC-passing reads than the minimum depth.
    LowCoverage,
    /// More QC-passing reads than the configured maximum depth.
    ExcessiveCoverage,
    /// None of the above; the position is usable for calling.
    Callable,
}

/// Number of distinct callable states.
pub const NUM_STATES: usize = 6;

impl CallableState {
    /// All states in rule-precedence order.
    pub const ALL: [CallableState; NUM_STATES] = [
        CallableState::RefN,
        CallableState::NoCoverage,
        CallableState::PoorMappingQuality,
        CallableState::LowCoverage,
        CallableState::ExcessiveCoverage,
        CallableState::Callable,
    ];

    /// Dense index in `0..NUM_STATES`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in interval files and summary tables.
    pub fn label(self) -> &'static str {
        match self {
            CallableState::RefN => "REF_N",
            CallableState::NoCoverage => "NO_COVERAGE",
            CallableState::PoorMappingQuality => "POOR_MAPPING_QUALITY",
            CallableState::LowCoverage => "LOW_COVERAGE",
            CallableState::ExcessiveCoverage => "EXCESSIVE_COVERAGE",
            CallableState::Callable => "CALLABLE",
        }
    }
}

impl fmt::Display for CallableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a state label cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown callable state label '{0}'")]
pub struct UnknownStateError(pub String);

impl FromStr for CallableState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallableState::ALL
            .into_iter()
            .find(|state| state.label() == s)
            .ok_or_else(|| UnknownStateError(s.to_string()))
    }
}

/// Per-state position counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct CallableCounts {
    counts: [u64; NUM_STATES],
}

impl CallableCounts {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more position in `state`.
    pub fn increment(&mut self, state: CallableState) {
        self.counts[state.index()] += 1;
    }

    /// Positions classified as `state`.
    pub fn get(&self, state: CallableState) -> u64 {
        self.counts[state.index()]
    }

    /// Sum over all states; equals the number of positions observed.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
    }

    /// `(state, count)` pairs in rule-precedence order.
    pub fn iter(&self) -> impl Iterator<Item = (CallableState, u64)> + '_ {
        CallableState::ALL
            .into_iter()
            .map(move |state| (state, self.get(state)))
    }
}
