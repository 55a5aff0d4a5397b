use std::fmt;
use std::sync::Arc;

/// Reference sequence declared in the alignment header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ContigInfo {
    /// Target id in the alignment header.
    pub tid: u32,
    /// Contig/chromosome name.
    #[cfg_attr(feature = "visualize", serde(serialize_with = "serialize_arc_str"))]
    pub name: Arc<str>,
    /// Declared length in bases.
    pub length: u64,
}

impl ContigInfo {
    /// Construct a contig descriptor.
    pub fn new(tid: u32, name: impl Into<Arc<str>>, length: u64) -> Self {
        Self {
            tid,
            name: name.into(),
            length,
        }
    }
}

#[cfg(feature = "visualize")]
pub(crate) fn serialize_arc_str<S: serde::Serializer>(
    value: &Arc<str>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value)
}

/// A single reference position, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct Locus {
    /// Contig name.
    #[cfg_attr(feature = "visualize", serde(serialize_with = "serialize_arc_str"))]
    pub contig: Arc<str>,
    /// 0-based coordinate.
    pub position: u64,
}

impl Locus {
    /// Construct a locus.
    pub fn new(contig: impl Into<Arc<str>>, position: u64) -> Self {
        Self {
            contig: contig.into(),
            position,
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-based, samtools style
        write!(f, "{}:{}", self.contig, self.position + 1)
    }
}

/// One read fragment overlapping a pileup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PileupRead {
    /// Mapping quality of the read (Phred).
    pub mapping_quality: u8,
    /// Base quality at the column; `None` when the read has a deletion here.
    pub base_quality: Option<u8>,
}

impl PileupRead {
    /// Read contributing an aligned base.
    pub fn new(mapping_quality: u8, base_quality: u8) -> Self {
        Self {
            mapping_quality,
            base_quality: Some(base_quality),
        }
    }

    /// Read spanning the column with a deletion.
    pub fn deletion(mapping_quality: u8) -> Self {
        Self {
            mapping_quality,
            base_quality: None,
        }
    }

    /// Whether the read is deleted at this column.
    pub fn is_deletion(&self) -> bool {
        self.base_quality.is_none()
    }
}

/// Reads overlapping one reference position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pileup {
    /// 0-based reference coordinate.
    pub position: u64,
    /// Overlapping fragments, unfiltered.
    pub reads: Vec<PileupRead>,
}

impl Pileup {
    /// Construct a pileup column.
    pub fn new(position: u64, reads: Vec<PileupRead>) -> Self {
        Self { position, reads }
    }

    /// Column with no overlapping reads.
    pub fn empty(position: u64) -> Self {
        Self {
            position,
            reads: Vec::new(),
        }
    }

    /// Raw (unfiltered) depth.
    pub fn depth(&self) -> usize {
        self.reads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locus_displays_one_based() {
        assert_eq!(Locus::new("chr1", 99).to_string(), "chr1:100");
    }

    #[test]
    fn deletion_has_no_base_quality() {
        assert!(PileupRead::deletion(60).is_deletion());
        assert!(!PileupRead::new(60, 30).is_deletion());
    }
}
