//! Analysis engine: input factories, the per-contig pileup traversal, the
//! read-level pass and the orchestrating [`CallableLociAnalyzer`].
//!
//! Every position of a selected contig is visited exactly once. Positions
//! missing from the pileup stream are classified as empty columns, so the
//! per-state counters of a contig always sum to its length.

mod analyzer;
mod control;
mod inputs;
mod traversal;

pub use analyzer::CallableLociAnalyzer;
pub use control::{CancellationToken, ProgressCallback};
pub use inputs::{AnalysisInputs, HtsInputs, InMemoryInputs, InMemoryReads, ReadEntry};

pub(crate) use control::RunControl;
pub(crate) use traversal::PileupPass;
