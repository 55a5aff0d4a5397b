use std::fs;
use std::path::{Path, PathBuf};

use callable_loci::callable::CallableState;
use callable_loci::genomics::create_bam_writer;
use callable_loci::intervals::{interval_file_name, read_intervals, Interval};
use callable_loci::report::fingerprint;
use callable_loci::{AnalysisConfig, AnalysisError, CallableLociAnalyzer, HtsInputs};
use rust_htslib::bam::{self, record::Cigar, record::CigarString};

const CHR1_LEN: u64 = 200;
const CHR2_LEN: u64 = 100;

fn record(name: &str, pos: i64, mapq: u8, flags: u16) -> bam::Record {
    let mut record = bam::Record::new();
    let cigar = CigarString(vec![Cigar::Match(50)]);
    record.set(name.as_bytes(), Some(&cigar), &[b'A'; 50], &[30; 50]);
    record.set_tid(0);
    record.set_pos(pos);
    record.set_mapq(mapq);
    record.set_flags(flags);
    record.set_mtid(-1);
    record.set_mpos(-1);
    record.set_insert_size(0);
    record
}

/// Writes `sample.bam` (+ `.bai`) and `ref.fa` (+ `.fai`) into `dir`.
///
/// chr1: six MAPQ 60 reads over 11-60, one duplicate there, and one MAPQ 0 read
/// over 101-150. chr2: no reads, first ten bases `N`.
fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let bam_path = dir.join("sample.bam");
    {
        let mut writer = create_bam_writer(&bam_path, &[("chr1", CHR1_LEN), ("chr2", CHR2_LEN)]).unwrap();
        for i in 0..6 {
            writer.write(&record(&format!("good{i}"), 10, 60, 0)).unwrap();
        }
        writer.write(&record("dup", 10, 60, 0x400)).unwrap();
        writer.write(&record("multi", 100, 0, 0)).unwrap();
    }
    bam::index::build(&bam_path, None, bam::index::Type::Bai, 1).unwrap();

    let chr1: String = (0..CHR1_LEN).map(|i| ['A', 'C', 'G', 'T'][(i % 4) as usize]).collect();
    let chr2: String = "N".repeat(10) + &"ACGT".repeat(((CHR2_LEN - 10) / 4) as usize) + "AC";
    assert_eq!(chr2.len() as u64, CHR2_LEN);

    let fasta_path = dir.join("ref.fa");
    let fasta = format!(">chr1\n{chr1}\n>chr2\n{chr2}\n");
    fs::write(&fasta_path, fasta).unwrap();
    let chr2_offset = 6 + CHR1_LEN + 1 + 6;
    let fai = format!(
        "chr1\t{CHR1_LEN}\t6\t{CHR1_LEN}\t{}\nchr2\t{CHR2_LEN}\t{chr2_offset}\t{CHR2_LEN}\t{}\n",
        CHR1_LEN + 1,
        CHR2_LEN + 1
    );
    fs::write(dir.join("ref.fa.fai"), fai).unwrap();

    (bam_path, fasta_path)
}

#[test]
fn bam_and_fasta_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (bam_path, fasta_path) = write_fixture(dir.path());
    let out = dir.path().join("intervals");
    fs::create_dir(&out).unwrap();

    let inputs = HtsInputs::open(&bam_path, &fasta_path).unwrap();
    let config = AnalysisConfig::default().with_interval_dir(&out);
    let result = CallableLociAnalyzer::new(inputs, config)
        .unwrap()
        .run()
        .unwrap()
        .into_complete()
        .unwrap();

    assert_eq!(result.positions(), CHR1_LEN + CHR2_LEN);
    let callable = result.callable();
    assert_eq!(callable.get(CallableState::Callable), 50);
    assert_eq!(callable.get(CallableState::PoorMappingQuality), 50);
    assert_eq!(callable.get(CallableState::RefN), 10);
    assert_eq!(callable.get(CallableState::NoCoverage), 190);
    assert_eq!(result.coverage().covered_positions, 50);
    assert_eq!(result.coverage().histogram.bins()[6], 50);

    let chr1 = read_intervals(&out.join(interval_file_name("chr1"))).unwrap();
    assert_eq!(
        chr1,
        vec![
            Interval::new("chr1", 1, 10, CallableState::NoCoverage),
            Interval::new("chr1", 11, 60, CallableState::Callable),
            Interval::new("chr1", 61, 100, CallableState::NoCoverage),
            Interval::new("chr1", 101, 150, CallableState::PoorMappingQuality),
            Interval::new("chr1", 151, 200, CallableState::NoCoverage),
        ]
    );
    let chr2 = read_intervals(&out.join(interval_file_name("chr2"))).unwrap();
    assert_eq!(chr2.len(), 2);
    assert_eq!(chr2[0], Interval::new("chr2", 1, 10, CallableState::RefN));

    let stats = result.read_stats().expect("read pass enabled by default");
    assert_eq!(stats.total_reads, 8);
    assert_eq!(stats.aligned_reads, 8);
    assert_eq!(stats.duplicate_reads, 1);
    assert!((stats.mean_read_length - 50.0).abs() < 1e-9);
}

#[test]
fn parallel_run_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let (bam_path, fasta_path) = write_fixture(dir.path());

    let run = |threads: usize| {
        let inputs = HtsInputs::open(&bam_path, &fasta_path).unwrap();
        let config = AnalysisConfig::default().with_threads(threads);
        let result = CallableLociAnalyzer::new(inputs, config)
            .unwrap()
            .run()
            .unwrap()
            .into_complete()
            .unwrap();
        fingerprint(&result).unwrap()
    };
    assert_eq!(run(1), run(2));
}

#[test]
fn reference_missing_contig_fails_before_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let (bam_path, fasta_path) = write_fixture(dir.path());
    fs::write(dir.path().join("ref.fa.fai"), "chr1\t200\t6\t200\t201\n").unwrap();

    let err = HtsInputs::open(&bam_path, &fasta_path).unwrap_err();
    assert!(matches!(err, AnalysisError::Reference(_)));
}

#[test]
fn missing_index_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let (bam_path, fasta_path) = write_fixture(dir.path());
    fs::remove_file(dir.path().join("sample.bam.bai")).unwrap();

    let err = HtsInputs::open(&bam_path, &fasta_path).unwrap_err();
    assert!(matches!(err, AnalysisError::Io { .. }));
}
