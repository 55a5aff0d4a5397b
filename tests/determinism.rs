#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use callable_loci::report::fingerprint;
use callable_loci::{AnalysisConfig, CallableLociAnalyzer};

/// Digest of every interval file under `dir`, in file-name order.
fn interval_files_digest(dir: &Path) -> String {
    let mut names: Vec<_> = fs::read_dir(dir)
        .expect("interval directory readable")
        .map(|entry| entry.expect("directory entry").file_name())
        .collect();
    names.sort();
    let mut hasher = blake3::Hasher::new();
    for name in names {
        hasher.update(name.to_string_lossy().as_bytes());
        hasher.update(&fs::read(dir.join(&name)).expect("interval file readable"));
    }
    hasher.finalize().to_hex().to_string()
}

fn run_fingerprint(threads: usize, concurrent_passes: bool) -> (String, String) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AnalysisConfig::default()
        .with_threads(threads)
        .with_concurrent_passes(concurrent_passes)
        .with_check_interval(97)
        .with_interval_dir(dir.path());
    let outcome = CallableLociAnalyzer::new(common::mosaic_inputs(), config)
        .expect("valid configuration")
        .run()
        .expect("analysis succeeds");
    let result = outcome.into_complete().expect("not cancelled");
    let reports = fingerprint(&result).expect("rendering succeeds");
    (reports, interval_files_digest(dir.path()))
}

#[test]
fn repeated_runs_are_byte_identical() {
    let fingerprints: HashSet<(String, String)> = (0..5).map(|_| run_fingerprint(1, false)).collect();
    assert_eq!(fingerprints.len(), 1, "outputs diverged across runs");
}

#[test]
fn worker_count_does_not_change_output() {
    let (reports, intervals) = run_fingerprint(1, false);
    for threads in [2, 3, 8] {
        let (parallel_reports, parallel_intervals) = run_fingerprint(threads, false);
        assert_eq!(parallel_reports, reports, "{threads} threads diverged");
        assert_eq!(parallel_intervals, intervals, "{threads} threads wrote different interval files");
    }
    assert_eq!(run_fingerprint(4, true), (reports, intervals), "concurrent passes diverged");
}

#[test]
fn every_contig_gets_its_own_interval_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AnalysisConfig::default().with_threads(3).with_interval_dir(dir.path());
    let result = CallableLociAnalyzer::new(common::mosaic_inputs(), config)
        .expect("valid configuration")
        .run()
        .expect("analysis succeeds")
        .into_complete()
        .expect("not cancelled");

    let files: HashSet<_> = result
        .contigs()
        .iter()
        .map(|contig| contig.interval_file.clone().expect("interval file written"))
        .collect();
    assert_eq!(files.len(), result.contigs().len());
    assert_eq!(fs::read_dir(dir.path()).expect("readable").count(), files.len());
}
