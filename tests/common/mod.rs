#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use callable_loci::genomics::{Column, Pileup, PileupRead};
use callable_loci::InMemoryInputs;

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("CALLABLE_LOCI_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set CALLABLE_LOCI_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// `count` identical reads.
pub fn reads(count: usize, mapping_quality: u8, base_quality: u8) -> Vec<PileupRead> {
    vec![PileupRead::new(mapping_quality, base_quality); count]
}

/// Well-formed column at a 0-based position.
pub fn column(position: u64, reads: Vec<PileupRead>) -> Column {
    Column::Pileup(Pileup::new(position, reads))
}

/// Columns of `depth` good reads at every position in `positions`.
pub fn uniform_columns(positions: std::ops::Range<u64>, depth: usize) -> Vec<Column> {
    positions.map(|pos| column(pos, reads(depth, 60, 30))).collect()
}

/// Deterministic pseudo-random contig used by the multi-contig tests.
///
/// Depth varies between 0 and 39 along the contig, every 17th position has
/// a low-MAPQ read mixed in and the reference carries an `N` run.
pub fn mosaic_contig(name: &str, length: u64, seed: u64) -> (String, Vec<u8>, Vec<Column>) {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state >> 33
    };

    let bases: Vec<u8> = (0..length)
        .map(|pos| if (length / 3..length / 3 + 5).contains(&pos) { b'N' } else { b"ACGT"[(pos % 4) as usize] })
        .collect();
    let mut columns = Vec::new();
    for pos in 0..length {
        let depth = (next() % 40) as usize;
        if depth == 0 {
            continue;
        }
        let mut column_reads = reads(depth, 60, 30);
        if pos % 17 == 0 {
            column_reads.push(PileupRead::new(0, 30));
        }
        if pos % 11 == 0 {
            column_reads.push(PileupRead::deletion(60));
        }
        columns.push(column(pos, column_reads));
    }
    (name.to_string(), bases, columns)
}

/// Several mosaic contigs, including one without any reads.
pub fn mosaic_inputs() -> InMemoryInputs {
    let mut contigs = vec![
        mosaic_contig("chr1", 2_000, 1),
        mosaic_contig("chr2", 1_500, 2),
        mosaic_contig("chr3", 700, 3),
        mosaic_contig("chrX", 1_200, 4),
    ];
    contigs.push(("chrEmpty".to_string(), b"ACGTACGTAC".to_vec(), Vec::new()));
    contigs.push(mosaic_contig("chrM", 300, 5));
    InMemoryInputs::new(contigs)
}
