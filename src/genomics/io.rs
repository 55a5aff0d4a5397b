use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_htslib::bam::{self, header::Header, header::HeaderRecord, Read, Writer};

use crate::genomics::{ContigInfo, SourceError};

/// Whether a path names a CRAM file.
pub fn is_cram(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("cram"))
        .unwrap_or(false)
}

/// Candidate index locations for an alignment file, in lookup order.
pub fn index_candidates(alignment: &Path) -> Vec<PathBuf> {
    let appended = |suffix: &str| {
        let mut name = alignment.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    if is_cram(alignment) {
        vec![appended(".crai"), alignment.with_extension("crai")]
    } else {
        vec![
            appended(".bai"),
            alignment.with_extension("bai"),
            appended(".csi"),
            alignment.with_extension("csi"),
        ]
    }
}

/// First existing index for `alignment`, if any.
pub fn find_index(alignment: &Path) -> Option<PathBuf> {
    index_candidates(alignment).into_iter().find(|path| path.is_file())
}

/// Contigs declared in the alignment header, in header order.
pub fn read_header_contigs(alignment: &Path) -> Result<Vec<ContigInfo>, SourceError> {
    let reader = bam::Reader::from_path(alignment).map_err(|err| SourceError::Open {
        path: alignment.display().to_string(),
        message: err.to_string(),
    })?;
    let header = reader.header();
    let mut contigs = Vec::with_capacity(header.target_count() as usize);
    for tid in 0..header.target_count() {
        let name = std::str::from_utf8(header.tid2name(tid)).map_err(|_| SourceError::Open {
            path: alignment.display().to_string(),
            message: format!("contig name of target {tid} is not UTF-8"),
        })?;
        let length = header.target_len(tid).unwrap_or(0);
        contigs.push(ContigInfo::new(tid, name, length));
    }
    Ok(contigs)
}

/// Create a coordinate-sorted BAM writer declaring the given contigs.
///
/// The caller writes records in coordinate order and indexes the file once the
/// writer is dropped.
pub fn create_bam_writer<P: AsRef<Path>>(output_path: P, contigs: &[(&str, u64)]) -> Result<Writer> {
    let mut header = Header::new();

    let mut hd = HeaderRecord::new(b"HD");
    hd.push_tag(b"VN", &"1.6");
    hd.push_tag(b"SO", &"coordinate");
    header.push_record(&hd);

    for &(name, length) in contigs {
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", &name);
        sq.push_tag(b"LN", &(length as i64));
        header.push_record(&sq);
    }

    let writer = bam::Writer::from_path(output_path, &header, bam::Format::Bam)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_candidates_follow_format() {
        let bam = index_candidates(Path::new("/data/sample.bam"));
        assert_eq!(bam[0], PathBuf::from("/data/sample.bam.bai"));
        assert_eq!(bam[1], PathBuf::from("/data/sample.bai"));

        let cram = index_candidates(Path::new("/data/sample.cram"));
        assert_eq!(cram[0], PathBuf::from("/data/sample.cram.crai"));
        assert!(is_cram(Path::new("x.CRAM")));
    }

    #[test]
    fn header_contigs_keep_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.bam");
        {
            let _writer = create_bam_writer(&path, &[("chr2", 50), ("chr10", 20), ("chr1", 30)]).unwrap();
        }
        let contigs = read_header_contigs(&path).unwrap();
        let names: Vec<&str> = contigs.iter().map(|c| &*c.name).collect();
        assert_eq!(names, vec!["chr2", "chr10", "chr1"]);
        assert_eq!(contigs[1].length, 20);
        assert_eq!(contigs[2].tid, 2);
    }
}
