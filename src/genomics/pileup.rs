use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rust_htslib::bam::{self, Read};
use thiserror::Error;

use crate::genomics::{ContigInfo, Pileup, PileupRead};

/// Default cap on reads per pileup column handed to htslib.
pub const DEFAULT_PILEUP_DEPTH_LIMIT: u32 = 100_000;

/// Reads never contributing to a pileup: unmapped, secondary, QC-fail, duplicate.
pub const DEFAULT_EXCLUDE_FLAGS: u16 = 0x4 | 0x100 | 0x200 | 0x400;

/// Errors raised by alignment-backed sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File could not be opened (missing, unreadable, or no index).
    #[error("failed to open {path}: {message}")]
    Open {
        /// Path that failed.
        path: String,
        /// Reason reported by the backend.
        message: String,
    },

    /// Region query against the index failed.
    #[error("failed to fetch {contig}: {message}")]
    Fetch {
        /// Contig requested.
        contig: String,
        /// Reason reported by the backend.
        message: String,
    },

    /// Malformed record encountered while streaming.
    #[error("malformed record: {0}")]
    Decode(String),
}

/// Boxed stream of pileup columns for one contig.
pub type PileupColumns<'a> = Box<dyn Iterator<Item = Result<Pileup, SourceError>> + 'a>;

/// Lazy, position-ordered pileup columns from an indexed alignment.
///
/// Sources may skip positions without reads; callers fill those gaps.
pub trait PileupSource {
    /// Stream the columns of `contig` in ascending position order.
    fn walk_contig(&mut self, contig: &ContigInfo) -> Result<PileupColumns<'_>, SourceError>;
}

/// Pileup source backed by an htslib indexed BAM/CRAM reader.
pub struct HtsPileupSource {
    reader: bam::IndexedReader,
    depth_limit: u32,
    exclude_flags: u16,
}

impl std::fmt::Debug for HtsPileupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtsPileupSource")
            .field("depth_limit", &self.depth_limit)
            .field("exclude_flags", &self.exclude_flags)
            .finish()
    }
}

impl HtsPileupSource {
    /// Open an indexed alignment; CRAM input also needs the reference.
    pub fn open(alignment: &Path, reference: Option<&Path>) -> Result<Self, SourceError> {
        let open_error = |message: String| SourceError::Open {
            path: alignment.display().to_string(),
            message,
        };
        let mut reader =
            bam::IndexedReader::from_path(alignment).map_err(|err| open_error(err.to_string()))?;
        if let Some(reference) = reference {
            reader
                .set_reference(reference)
                .map_err(|err| open_error(err.to_string()))?;
        }
        Ok(Self {
            reader,
            depth_limit: DEFAULT_PILEUP_DEPTH_LIMIT,
            exclude_flags: DEFAULT_EXCLUDE_FLAGS,
        })
    }

    /// Set the per-column read cap passed to htslib.
    pub fn with_depth_limit(mut self, depth_limit: u32) -> Self {
        self.depth_limit = depth_limit.max(1);
        self
    }

    /// Set the SAM flags whose reads are dropped from columns.
    pub fn with_exclude_flags(mut self, exclude_flags: u16) -> Self {
        self.exclude_flags = exclude_flags;
        self
    }
}

fn collect_column(column: &bam::pileup::Pileup, exclude_flags: u16) -> Pileup {
    let reads = column
        .alignments()
        .filter(|alignment| !alignment.is_refskip())
        .filter_map(|alignment| {
            let record = alignment.record();
            if record.flags() & exclude_flags != 0 {
                return None;
            }
            let mapq = record.mapq();
            if alignment.is_del() {
                return Some(PileupRead::deletion(mapq));
            }
            let quality = alignment
                .qpos()
                .and_then(|qpos| record.qual().get(qpos).copied())
                .unwrap_or(0);
            Some(PileupRead::new(mapq, quality))
        })
        .collect();
    Pileup::new(column.pos() as u64, reads)
}

impl PileupSource for HtsPileupSource {
    fn walk_contig(&mut self, contig: &ContigInfo) -> Result<PileupColumns<'_>, SourceError> {
        self.reader
            .fetch((contig.tid, 0u64, contig.length))
            .map_err(|err| SourceError::Fetch {
                contig: contig.name.to_string(),
                message: err.to_string(),
            })?;

        let tid = contig.tid;
        let exclude_flags = self.exclude_flags;
        let depth_limit = self.depth_limit;
        let mut pileups = self.reader.pileup();
        pileups.set_max_depth(depth_limit);

        Ok(Box::new(pileups.filter_map(move |column| match column {
            Ok(column) if column.tid() != tid => None,
            Ok(column) => Some(Ok(collect_column(&column, exclude_flags))),
            Err(err) => Some(Err(SourceError::Decode(err.to_string()))),
        })))
    }
}

/// Column entry of an in-memory alignment; `Corrupt` simulates a decode failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Well-formed pileup column.
    Pileup(Pileup),
    /// Undecodable record with a message.
    Corrupt(String),
}

/// Pileup columns held in memory, keyed by contig name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPileupSource {
    columns: Arc<HashMap<Arc<str>, Vec<Column>>>,
}

impl InMemoryPileupSource {
    /// Build from per-contig column lists.
    pub fn new(columns: HashMap<Arc<str>, Vec<Column>>) -> Self {
        Self {
            columns: Arc::new(columns),
        }
    }
}

impl PileupSource for InMemoryPileupSource {
    fn walk_contig(&mut self, contig: &ContigInfo) -> Result<PileupColumns<'_>, SourceError> {
        let columns = self.columns.get(&contig.name).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Box::new(columns.iter().map(|column| match column {
            Column::Pileup(pileup) => Ok(pileup.clone()),
            Column::Corrupt(message) => Err(SourceError::Decode(message.clone())),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_source_streams_columns_and_errors() {
        let mut columns = HashMap::new();
        columns.insert(
            Arc::from("chr1"),
            vec![
                Column::Pileup(Pileup::new(3, vec![PileupRead::new(60, 30)])),
                Column::Corrupt("truncated block".to_string()),
            ],
        );
        let mut source = InMemoryPileupSource::new(columns);
        let contig = ContigInfo::new(0, "chr1", 10);

        let items: Vec<_> = source.walk_contig(&contig).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().position, 3);
        assert!(matches!(items[1], Err(SourceError::Decode(_))));

        let other = ContigInfo::new(1, "chr2", 10);
        assert_eq!(source.walk_contig(&other).unwrap().count(), 0);
    }
}
