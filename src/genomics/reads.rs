use std::path::Path;

use rust_htslib::bam::{self, Read};

use crate::coverage::RunningStats;
use crate::genomics::SourceError;

const FLAG_PAIRED: u16 = 0x1;
const FLAG_PROPER_PAIR: u16 = 0x2;
const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_SECONDARY: u16 = 0x100;
const FLAG_DUPLICATE: u16 = 0x400;
const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// The fields of a raw alignment record the read-level pass needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadObservation {
    /// SAM flags.
    pub flags: u16,
    /// Read length in bases.
    pub length: u32,
    /// Signed template length (TLEN).
    pub template_length: i64,
    /// `(tid, 0-based position)` for placed records.
    pub locus: Option<(u32, u64)>,
}

impl ReadObservation {
    /// Construct an observation.
    pub fn new(flags: u16, length: u32, template_length: i64) -> Self {
        Self {
            flags,
            length,
            template_length,
            locus: None,
        }
    }

    /// Attach the record's placement.
    pub fn with_locus(mut self, tid: u32, position: u64) -> Self {
        self.locus = Some((tid, position));
        self
    }

    fn has(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Neither secondary nor supplementary.
    pub fn is_primary(&self) -> bool {
        !self.has(FLAG_SECONDARY) && !self.has(FLAG_SUPPLEMENTARY)
    }

    /// Mapped to the reference.
    pub fn is_mapped(&self) -> bool {
        !self.has(FLAG_UNMAPPED)
    }

    /// Sequenced as part of a pair.
    pub fn is_paired(&self) -> bool {
        self.has(FLAG_PAIRED)
    }

    /// Aligned in a proper pair.
    pub fn is_proper_pair(&self) -> bool {
        self.has(FLAG_PAIRED) && self.has(FLAG_PROPER_PAIR)
    }

    /// Marked as PCR/optical duplicate.
    pub fn is_duplicate(&self) -> bool {
        self.has(FLAG_DUPLICATE)
    }
}

/// Any stream of raw read observations.
pub trait ReadSource: Iterator<Item = Result<ReadObservation, SourceError>> {}

impl<T> ReadSource for T where T: Iterator<Item = Result<ReadObservation, SourceError>> {}

/// Sequential reader over every record of a BAM/CRAM file.
pub struct HtsReadSource {
    reader: bam::Reader,
    record: bam::Record,
}

impl std::fmt::Debug for HtsReadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtsReadSource").finish_non_exhaustive()
    }
}

impl HtsReadSource {
    /// Open an alignment file for a full scan.
    pub fn open(alignment: &Path, reference: Option<&Path>) -> Result<Self, SourceError> {
        let open_error = |err: rust_htslib::errors::Error| SourceError::Open {
            path: alignment.display().to_string(),
            message: err.to_string(),
        };
        let mut reader = bam::Reader::from_path(alignment).map_err(open_error)?;
        if let Some(reference) = reference {
            reader.set_reference(reference).map_err(open_error)?;
        }
        Ok(Self {
            reader,
            record: bam::Record::new(),
        })
    }
}

impl Iterator for HtsReadSource {
    type Item = Result<ReadObservation, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read(&mut self.record)? {
            Ok(()) => {
                let read = ReadObservation::new(
                    self.record.flags(),
                    self.record.seq_len() as u32,
                    self.record.insert_size(),
                );
                let (tid, pos) = (self.record.tid(), self.record.pos());
                Some(Ok(if tid >= 0 && pos >= 0 {
                    read.with_locus(tid as u32, pos as u64)
                } else {
                    read
                }))
            }
            Err(err) => Some(Err(SourceError::Decode(err.to_string()))),
        }
    }
}

/// Geometry of the insert-size histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct InsertSizeConfig {
    /// Width of each bucket in bp.
    pub bucket_width: u32,
    /// Sizes at or beyond this land in the last bucket.
    pub max_insert_size: u32,
}

impl Default for InsertSizeConfig {
    fn default() -> Self {
        Self {
            bucket_width: 10,
            max_insert_size: 10_000,
        }
    }
}

/// Bucketed insert sizes; memory is fixed by [`InsertSizeConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct InsertSizeHistogram {
    bucket_width: u32,
    buckets: Vec<u64>,
}

impl InsertSizeHistogram {
    /// Empty histogram with the given geometry.
    pub fn new(config: InsertSizeConfig) -> Self {
        let bucket_width = config.bucket_width.max(1);
        let buckets = (config.max_insert_size / bucket_width) as usize + 1;
        Self {
            bucket_width,
            buckets: vec![0; buckets],
        }
    }

    /// Record one insert size.
    pub fn observe(&mut self, size: u64) {
        let last = self.buckets.len() - 1;
        let bucket = ((size / self.bucket_width as u64) as usize).min(last);
        self.buckets[bucket] += 1;
    }

    /// Counts per bucket.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Bucket width in bp.
    pub fn bucket_width(&self) -> u32 {
        self.bucket_width
    }

    /// Pairs recorded.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    fn midpoint(&self, bucket: usize) -> f64 {
        let width = self.bucket_width as f64;
        bucket as f64 * width + (width - 1.0) / 2.0
    }

    /// Mean/median/stddev derived from bucket midpoints.
    pub fn summarize(&self) -> InsertSizeSummary {
        let pairs = self.total();
        if pairs == 0 {
            return InsertSizeSummary::default();
        }

        let mut stats = RunningStats::new();
        for (bucket, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                stats.merge(&RunningStats::repeated(self.midpoint(bucket), count));
            }
        }

        let rank = (pairs - 1) / 2;
        let mut seen = 0u64;
        let mut median = 0.0;
        for (bucket, &count) in self.buckets.iter().enumerate() {
            seen += count;
            if seen > rank {
                median = self.midpoint(bucket);
                break;
            }
        }

        InsertSizeSummary {
            pairs,
            mean: stats.mean(),
            median,
            stddev: stats.stddev(),
        }
    }
}

/// Insert-size figures for properly paired, non-duplicate primary reads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct InsertSizeSummary {
    /// Pairs contributing.
    pub pairs: u64,
    /// Mean insert size.
    pub mean: f64,
    /// Lower median (bucket midpoint).
    pub median: f64,
    /// Sample standard deviation.
    pub stddev: f64,
}

/// Alignment, pairing and insert-size figures from the read-level pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ReadStats {
    /// Every record seen.
    pub total_reads: u64,
    /// Records that are neither secondary nor supplementary.
    pub primary_reads: u64,
    /// Primary records that are mapped.
    pub aligned_reads: u64,
    /// Primary records from paired sequencing.
    pub paired_reads: u64,
    /// Primary records in proper pairs.
    pub properly_paired_reads: u64,
    /// Primary records flagged as duplicates.
    pub duplicate_reads: u64,
    /// Mean length of primary reads.
    pub mean_read_length: f64,
    /// Insert-size summary.
    pub insert_size: InsertSizeSummary,
    /// Insert-size histogram.
    pub insert_size_histogram: InsertSizeHistogram,
}

impl ReadStats {
    fn ratio(numerator: u64, denominator: u64) -> f64 {
        if denominator == 0 {
            0.0
        } else {
            numerator as f64 / denominator as f64
        }
    }

    /// Aligned over primary reads.
    pub fn alignment_rate(&self) -> f64 {
        Self::ratio(self.aligned_reads, self.primary_reads)
    }

    /// Properly paired over paired primary reads.
    pub fn proper_pair_rate(&self) -> f64 {
        Self::ratio(self.properly_paired_reads, self.paired_reads)
    }

    /// Duplicates over primary reads.
    pub fn duplicate_rate(&self) -> f64 {
        Self::ratio(self.duplicate_reads, self.primary_reads)
    }
}

/// Accumulates [`ReadStats`] in one streaming pass over raw records.
#[derive(Debug, Clone)]
pub struct ReadLevelCollector {
    total: u64,
    primary: u64,
    aligned: u64,
    paired: u64,
    properly_paired: u64,
    duplicates: u64,
    read_length: RunningStats,
    insert_sizes: InsertSizeHistogram,
}

impl ReadLevelCollector {
    /// Empty collector.
    pub fn new(insert_size: InsertSizeConfig) -> Self {
        Self {
            total: 0,
            primary: 0,
            aligned: 0,
            paired: 0,
            properly_paired: 0,
            duplicates: 0,
            read_length: RunningStats::new(),
            insert_sizes: InsertSizeHistogram::new(insert_size),
        }
    }

    /// Account for one record.
    pub fn observe(&mut self, read: &ReadObservation) {
        self.total += 1;
        if !read.is_primary() {
            return;
        }
        self.primary += 1;
        self.read_length.push(read.length as f64);
        if read.is_mapped() {
            self.aligned += 1;
        }
        if read.is_duplicate() {
            self.duplicates += 1;
        }
        if !read.is_paired() {
            return;
        }
        self.paired += 1;
        if read.is_proper_pair() {
            self.properly_paired += 1;
            // positive TLEN marks the leftmost mate, so each pair counts once
            if !read.is_duplicate() && read.template_length > 0 {
                self.insert_sizes.observe(read.template_length as u64);
            }
        }
    }

    /// Records seen so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Derive the final statistics.
    pub fn finish(self) -> ReadStats {
        ReadStats {
            total_reads: self.total,
            primary_reads: self.primary,
            aligned_reads: self.aligned,
            paired_reads: self.paired,
            properly_paired_reads: self.properly_paired,
            duplicate_reads: self.duplicates,
            mean_read_length: self.read_length.mean(),
            insert_size: self.insert_sizes.summarize(),
            insert_size_histogram: self.insert_sizes,
        }
    }
}
