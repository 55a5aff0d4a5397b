#[path = "common/mod.rs"]
mod common;

use callable_loci::callable::{classify, CallableParams, CallableState};
use callable_loci::genomics::{Column, Pileup, PileupRead};
use callable_loci::intervals::{coalesce, expand_intervals, interval_file_name, read_intervals};
use callable_loci::{AnalysisConfig, CallableLociAnalyzer, InMemoryInputs};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct ColumnSpec {
    good: usize,
    low_mapq: usize,
    low_baseq: usize,
    deletions: usize,
}

impl ColumnSpec {
    fn reads(&self) -> Vec<PileupRead> {
        let mut reads = vec![PileupRead::new(60, 30); self.good];
        reads.extend(vec![PileupRead::new(0, 30); self.low_mapq]);
        reads.extend(vec![PileupRead::new(40, 8); self.low_baseq]);
        reads.extend(vec![PileupRead::deletion(50); self.deletions]);
        reads
    }
}

fn column_spec() -> impl Strategy<Value = Option<ColumnSpec>> {
    prop::option::weighted(
        0.8,
        (0usize..12, 0usize..3, 0usize..3, 0usize..2).prop_map(|(good, low_mapq, low_baseq, deletions)| ColumnSpec {
            good,
            low_mapq,
            low_baseq,
            deletions,
        }),
    )
}

fn contig_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<Option<ColumnSpec>>)> {
    (1usize..300).prop_flat_map(|length| {
        (
            prop::collection::vec(prop::sample::select(b"ACGTNacgt".to_vec()), length),
            prop::collection::vec(column_spec(), length),
        )
    })
}

fn expected_states(bases: &[u8], specs: &[Option<ColumnSpec>], params: &CallableParams) -> Vec<CallableState> {
    specs
        .iter()
        .enumerate()
        .map(|(pos, spec)| {
            let reads = spec.as_ref().map(ColumnSpec::reads).unwrap_or_default();
            classify(bases[pos], &Pileup::new(pos as u64, reads), params)
        })
        .collect()
}

fn columns(specs: &[Option<ColumnSpec>]) -> Vec<Column> {
    specs
        .iter()
        .enumerate()
        .filter_map(|(pos, spec)| spec.as_ref().map(|spec| common::column(pos as u64, spec.reads())))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn counters_partition_and_histogram_conserves((bases, specs) in contig_strategy(), threads in 1usize..4) {
        let length = bases.len() as u64;
        let inputs = InMemoryInputs::new([
            ("chrA", bases.clone(), columns(&specs)),
            ("chrB", bases, columns(&specs)),
        ]);
        let config = AnalysisConfig::default().with_threads(threads).with_read_stats(false);
        let outcome = CallableLociAnalyzer::new(inputs, config).unwrap().run().unwrap();
        let result = outcome.into_complete().unwrap();

        prop_assert_eq!(result.positions(), 2 * length);
        prop_assert_eq!(result.callable().total(), result.positions());
        prop_assert_eq!(result.coverage().histogram.total(), result.positions());
        for contig in result.contigs() {
            prop_assert_eq!(contig.callable.total(), length);
            prop_assert_eq!(contig.coverage.histogram.total(), length);
        }
        let summed: u64 = result.contigs().iter().map(|c| c.callable.get(CallableState::Callable)).sum();
        prop_assert_eq!(summed, result.callable().get(CallableState::Callable));
    }

    #[test]
    fn interval_files_reexpand_to_classifications((bases, specs) in contig_strategy()) {
        let params = CallableParams::default();
        let expected = expected_states(&bases, &specs, &params);
        let dir = tempfile::tempdir().unwrap();
        let inputs = InMemoryInputs::new([("chr7", bases, columns(&specs))]);
        let config = AnalysisConfig::default()
            .with_interval_dir(dir.path())
            .with_read_stats(false);
        let result = CallableLociAnalyzer::new(inputs, config).unwrap().run().unwrap().into_complete().unwrap();

        let intervals = read_intervals(&dir.path().join(interval_file_name("chr7"))).unwrap();
        prop_assert_eq!(intervals.len() as u64, result.contigs()[0].intervals);
        for pair in intervals.windows(2) {
            prop_assert_eq!(pair[0].end + 1, pair[1].start);
            prop_assert_ne!(pair[0].state, pair[1].state);
        }

        let expanded: Vec<CallableState> = expand_intervals(&intervals).map(|(_, state)| state).collect();
        prop_assert_eq!(&expanded, &expected);
        prop_assert_eq!(intervals, coalesce("chr7", &expected));
    }
}
