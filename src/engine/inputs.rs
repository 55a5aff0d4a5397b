use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::genomics::{
    find_index, is_cram, read_header_contigs, Column, ContigInfo, FaiIndex, FaidxReference,
    HtsPileupSource, HtsReadSource, InMemoryPileupSource, InMemoryReference, PileupSource,
    ReadObservation, ReadSource, ReferenceAccessor, SourceError, DEFAULT_EXCLUDE_FLAGS,
    DEFAULT_PILEUP_DEPTH_LIMIT,
};
use crate::AnalysisError;

/// Factory of per-worker input handles.
///
/// Handles are opened once per worker thread (and once more for the read
/// pass), so implementations only share immutable state.
pub trait AnalysisInputs: Sync {
    /// Pileup stream type.
    type Pileups: PileupSource;
    /// Reference accessor type.
    type Reference: ReferenceAccessor;
    /// Raw record stream type.
    type Reads: ReadSource;

    /// Header contigs, in header order.
    fn contigs(&self) -> &[ContigInfo];

    /// Open a pileup stream.
    fn open_pileups(&self) -> Result<Self::Pileups, AnalysisError>;

    /// Open a reference accessor.
    fn open_reference(&self) -> Result<Self::Reference, AnalysisError>;

    /// Open a raw record stream over the whole file.
    fn open_reads(&self) -> Result<Self::Reads, AnalysisError>;
}

/// Indexed BAM/CRAM plus indexed FASTA on disk.
#[derive(Debug, Clone)]
pub struct HtsInputs {
    alignment: PathBuf,
    reference: PathBuf,
    contigs: Vec<ContigInfo>,
    depth_limit: u32,
    exclude_flags: u16,
}

fn missing(path: &Path, what: &str) -> AnalysisError {
    AnalysisError::Io {
        path: path.display().to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, what.to_string()),
    }
}

impl HtsInputs {
    /// Validate both inputs and read the alignment header.
    ///
    /// Fails before any traversal when a file or index is missing, or when the
    /// reference does not declare every header contig with the same length.
    pub fn open(alignment: &Path, reference: &Path) -> Result<Self, AnalysisError> {
        if !alignment.is_file() {
            return Err(missing(alignment, "alignment file not found"));
        }
        let index = find_index(alignment)
            .ok_or_else(|| missing(alignment, "no .bai/.csi/.crai index next to alignment"))?;
        if !reference.is_file() {
            return Err(AnalysisError::Configuration(format!(
                "reference {} not found",
                reference.display()
            )));
        }
        let fai = FaiIndex::for_fasta(reference)?;
        let contigs = read_header_contigs(alignment)?;
        fai.check_covers(&contigs)?;

        debug!(
            alignment = %alignment.display(),
            index = %index.display(),
            contigs = contigs.len(),
            "inputs validated"
        );

        Ok(Self {
            alignment: alignment.to_path_buf(),
            reference: reference.to_path_buf(),
            contigs,
            depth_limit: DEFAULT_PILEUP_DEPTH_LIMIT,
            exclude_flags: DEFAULT_EXCLUDE_FLAGS,
        })
    }

    /// Per-column read cap handed to htslib.
    pub fn with_depth_limit(mut self, depth_limit: u32) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    /// SAM flags excluded from pileups.
    pub fn with_exclude_flags(mut self, exclude_flags: u16) -> Self {
        self.exclude_flags = exclude_flags;
        self
    }

    /// Alignment path.
    pub fn alignment(&self) -> &Path {
        &self.alignment
    }

    /// Reference path.
    pub fn reference(&self) -> &Path {
        &self.reference
    }

    fn cram_reference(&self) -> Option<&Path> {
        is_cram(&self.alignment).then_some(self.reference.as_path())
    }
}

impl AnalysisInputs for HtsInputs {
    type Pileups = HtsPileupSource;
    type Reference = FaidxReference;
    type Reads = HtsReadSource;

    fn contigs(&self) -> &[ContigInfo] {
        &self.contigs
    }

    fn open_pileups(&self) -> Result<HtsPileupSource, AnalysisError> {
        Ok(HtsPileupSource::open(&self.alignment, self.cram_reference())?
            .with_depth_limit(self.depth_limit)
            .with_exclude_flags(self.exclude_flags))
    }

    fn open_reference(&self) -> Result<FaidxReference, AnalysisError> {
        Ok(FaidxReference::open(&self.reference)?)
    }

    fn open_reads(&self) -> Result<HtsReadSource, AnalysisError> {
        Ok(HtsReadSource::open(&self.alignment, self.cram_reference())?)
    }
}

/// One entry of the in-memory record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEntry {
    /// A well-formed record.
    Read(ReadObservation),
    /// A record the decoder rejects with this message.
    Corrupt(String),
}

/// Raw record stream of [`InMemoryInputs`]; ends after the first corrupt entry.
#[derive(Debug, Clone)]
pub struct InMemoryReads {
    entries: Arc<Vec<ReadEntry>>,
    next: usize,
}

impl Iterator for InMemoryReads {
    type Item = Result<ReadObservation, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.get(self.next)?;
        self.next += 1;
        match entry {
            ReadEntry::Read(read) => Some(Ok(*read)),
            ReadEntry::Corrupt(message) => {
                self.next = self.entries.len();
                Some(Err(SourceError::Decode(message.clone())))
            }
        }
    }
}

/// Inputs held entirely in memory; used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInputs {
    contigs: Vec<ContigInfo>,
    pileups: InMemoryPileupSource,
    reference: InMemoryReference,
    reads: Arc<Vec<ReadEntry>>,
}

impl InMemoryInputs {
    /// Contigs with their bases and pileup columns; `tid`s follow the order given.
    pub fn new<N: Into<Arc<str>>>(contigs: impl IntoIterator<Item = (N, Vec<u8>, Vec<Column>)>) -> Self {
        let mut infos = Vec::new();
        let mut bases = Vec::new();
        let mut columns = HashMap::new();
        for (tid, (name, sequence, contig_columns)) in contigs.into_iter().enumerate() {
            let name: Arc<str> = name.into();
            infos.push(ContigInfo::new(tid as u32, Arc::clone(&name), sequence.len() as u64));
            bases.push((Arc::clone(&name), sequence));
            columns.insert(name, contig_columns);
        }
        Self {
            contigs: infos,
            pileups: InMemoryPileupSource::new(columns),
            reference: InMemoryReference::new(bases),
            reads: Arc::new(Vec::new()),
        }
    }

    /// Records seen by the read-level pass.
    pub fn with_reads(self, reads: Vec<ReadObservation>) -> Self {
        self.with_read_entries(reads.into_iter().map(ReadEntry::Read).collect())
    }

    /// Records seen by the read-level pass, possibly including corrupt ones.
    pub fn with_read_entries(mut self, entries: Vec<ReadEntry>) -> Self {
        self.reads = Arc::new(entries);
        self
    }
}

impl AnalysisInputs for InMemoryInputs {
    type Pileups = InMemoryPileupSource;
    type Reference = InMemoryReference;
    type Reads = InMemoryReads;

    fn contigs(&self) -> &[ContigInfo] {
        &self.contigs
    }

    fn open_pileups(&self) -> Result<InMemoryPileupSource, AnalysisError> {
        Ok(self.pileups.clone())
    }

    fn open_reference(&self) -> Result<InMemoryReference, AnalysisError> {
        Ok(self.reference.clone())
    }

    fn open_reads(&self) -> Result<InMemoryReads, AnalysisError> {
        Ok(InMemoryReads {
            entries: Arc::clone(&self.reads),
            next: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_alignment_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = HtsInputs::open(&dir.path().join("absent.bam"), &dir.path().join("ref.fa")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn unindexed_alignment_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let bam = dir.path().join("reads.bam");
        std::fs::write(&bam, b"not really a bam").unwrap();
        let err = HtsInputs::open(&bam, &dir.path().join("ref.fa")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn in_memory_contigs_follow_given_order() {
        let inputs = InMemoryInputs::new([
            ("chr2", b"ACGT".to_vec(), Vec::new()),
            ("chr1", b"AC".to_vec(), Vec::new()),
        ]);
        let names: Vec<&str> = inputs.contigs().iter().map(|c| &*c.name).collect();
        assert_eq!(names, vec!["chr2", "chr1"]);
        assert_eq!(inputs.contigs()[1].length, 2);
    }

    #[test]
    fn in_memory_reads_stop_after_corrupt_entry() {
        let inputs = InMemoryInputs::default().with_read_entries(vec![
            ReadEntry::Read(ReadObservation::new(0, 100, 0)),
            ReadEntry::Corrupt("bad cigar".to_string()),
            ReadEntry::Read(ReadObservation::new(0, 100, 0)),
        ]);
        let items: Vec<_> = inputs.open_reads().unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(SourceError::Decode(ref message)) if message == "bad cigar"));
    }
}
