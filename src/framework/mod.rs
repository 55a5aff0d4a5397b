//! Per-contig evaluation framework.
//!
//! Analyses implement [`ContigProcessor`]; [`ContigEvaluator`] runs them on
//! the calling thread or a worker pool and always returns per-contig
//! summaries in header order, so the downstream merge is deterministic.

mod contig_eval;

pub use contig_eval::{
    ContigContext, ContigEvaluator, ContigProcessor, EvaluatorConfig, FrameworkError,
};
