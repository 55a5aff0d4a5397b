use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_htslib::faidx;
use thiserror::Error;

use crate::genomics::ContigInfo;

/// Reference lookup failures.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// FASTA or its `.fai` could not be opened or parsed.
    #[error("reference {path}: {message}")]
    Open {
        /// File involved.
        path: String,
        /// Reason.
        message: String,
    },

    /// Contig named in the alignment header is absent from the reference.
    #[error("contig {0} not present in reference")]
    MissingContig(String),

    /// Reference and alignment header disagree on contig length.
    #[error("contig {contig}: reference has {reference} bases, alignment header declares {header}")]
    LengthMismatch {
        /// Contig name.
        contig: String,
        /// Length in the reference.
        reference: u64,
        /// Length in the alignment header.
        header: u64,
    },
}

/// Supplies reference bases one contig at a time.
pub trait ReferenceAccessor {
    /// Bases of `contig`; exactly `contig.length` long.
    fn contig_bases(&mut self, contig: &ContigInfo) -> Result<&[u8], ReferenceError>;
}

/// Parsed `.fai` index: contig names and lengths in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaiIndex {
    entries: Vec<(String, u64)>,
}

impl FaiIndex {
    /// Path of the `.fai` sidecar for a FASTA.
    pub fn sidecar_path(fasta: &Path) -> PathBuf {
        let mut name = fasta.as_os_str().to_owned();
        name.push(".fai");
        PathBuf::from(name)
    }

    /// Read the `.fai` next to `fasta`.
    pub fn for_fasta(fasta: &Path) -> Result<Self, ReferenceError> {
        let path = Self::sidecar_path(fasta);
        let contents = fs::read_to_string(&path).map_err(|err| ReferenceError::Open {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&contents).map_err(|message| ReferenceError::Open {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse `.fai` text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let name = fields
                .next()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| format!("line {}: missing contig name", idx + 1))?;
            let length = fields
                .next()
                .and_then(|len| len.parse::<u64>().ok())
                .ok_or_else(|| format!("line {}: invalid length", idx + 1))?;
            entries.push((name.to_string(), length));
        }
        Ok(Self { entries })
    }

    /// Declared length of `contig`.
    pub fn length(&self, contig: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| name == contig)
            .map(|&(_, length)| length)
    }

    /// Check that every contig exists with the header-declared length.
    pub fn check_covers(&self, contigs: &[ContigInfo]) -> Result<(), ReferenceError> {
        for contig in contigs {
            match self.length(&contig.name) {
                None => return Err(ReferenceError::MissingContig(contig.name.to_string())),
                Some(length) if length != contig.length => {
                    return Err(ReferenceError::LengthMismatch {
                        contig: contig.name.to_string(),
                        reference: length,
                        header: contig.length,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Indexed FASTA reader caching the most recently requested contig.
pub struct FaidxReference {
    reader: faidx::Reader,
    cached: Option<Arc<str>>,
    bases: Vec<u8>,
}

impl std::fmt::Debug for FaidxReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaidxReference")
            .field("cached", &self.cached)
            .field("bases", &self.bases.len())
            .finish()
    }
}

impl FaidxReference {
    /// Open an indexed FASTA.
    pub fn open(path: &Path) -> Result<Self, ReferenceError> {
        let reader = faidx::Reader::from_path(path).map_err(|err| ReferenceError::Open {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            reader,
            cached: None,
            bases: Vec::new(),
        })
    }
}

impl ReferenceAccessor for FaidxReference {
    fn contig_bases(&mut self, contig: &ContigInfo) -> Result<&[u8], ReferenceError> {
        if self.cached.as_deref() != Some(&*contig.name) {
            self.cached = None;
            self.bases.clear();
            if contig.length > 0 {
                // htslib clamps the end to the contig length
                let sequence = self
                    .reader
                    .fetch_seq_string(&*contig.name, 0, contig.length as usize)
                    .map_err(|_| ReferenceError::MissingContig(contig.name.to_string()))?;
                self.bases = sequence.into_bytes();
            }
            if self.bases.len() as u64 != contig.length {
                return Err(ReferenceError::LengthMismatch {
                    contig: contig.name.to_string(),
                    reference: self.bases.len() as u64,
                    header: contig.length,
                });
            }
            self.cached = Some(Arc::clone(&contig.name));
        }
        Ok(&self.bases)
    }
}

/// Reference sequences held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    contigs: Arc<HashMap<Arc<str>, Vec<u8>>>,
}

impl InMemoryReference {
    /// Build from `(name, bases)` pairs.
    pub fn new<N: Into<Arc<str>>>(contigs: impl IntoIterator<Item = (N, Vec<u8>)>) -> Self {
        Self {
            contigs: Arc::new(
                contigs
                    .into_iter()
                    .map(|(name, bases)| (name.into(), bases))
                    .collect(),
            ),
        }
    }
}

impl ReferenceAccessor for InMemoryReference {
    fn contig_bases(&mut self, contig: &ContigInfo) -> Result<&[u8], ReferenceError> {
        let bases = self
            .contigs
            .get(&contig.name)
            .ok_or_else(|| ReferenceError::MissingContig(contig.name.to_string()))?;
        if bases.len() as u64 != contig.length {
            return Err(ReferenceError::LengthMismatch {
                contig: contig.name.to_string(),
                reference: bases.len() as u64,
                header: contig.length,
            });
        }
        Ok(bases)
    }
}
