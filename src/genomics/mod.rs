//! Genomic inputs: header contigs, pileup columns, reference bases and raw
//! read records.
//!
//! Each input is reached through a small trait ([`PileupSource`],
//! [`ReferenceAccessor`], [`ReadSource`]) with an htslib-backed implementation
//! for real files and an in-memory one for tests and embedding.

mod io;
mod pileup;
mod reads;
mod reference;
mod types;

pub use io::{create_bam_writer, find_index, index_candidates, is_cram, read_header_contigs};
pub use pileup::{
    Column, HtsPileupSource, InMemoryPileupSource, PileupColumns, PileupSource, SourceError,
    DEFAULT_EXCLUDE_FLAGS, DEFAULT_PILEUP_DEPTH_LIMIT,
};
pub use reads::{
    HtsReadSource, InsertSizeConfig, InsertSizeHistogram, InsertSizeSummary, ReadLevelCollector,
    ReadObservation, ReadSource, ReadStats,
};
pub use reference::{FaiIndex, FaidxReference, InMemoryReference, ReferenceAccessor, ReferenceError};
#[cfg(feature = "visualize")]
pub(crate) use types::serialize_arc_str;
pub use types::{ContigInfo, Locus, Pileup, PileupRead};
