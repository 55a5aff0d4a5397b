//! Callable-state classification.
//!
//! A position is classified by the first rule it fails, in the order of
//! [`CallableState`]'s variants. Classification is a pure function of the
//! reference base, the pileup column and [`CallableParams`].

mod classifier;
mod state;

pub use classifier::{classify, classify_counts, CallableParams, ClassifierError, PileupCounts};
pub use state::{CallableCounts, CallableState, UnknownStateError, NUM_STATES};
