//! Tab-separated renderings of an analysis result.
//!
//! Each table has a `write_*` function streaming to any [`std::io::Write`] and
//! a `render_*` twin returning a `String` for tests and snapshots.

use std::io::Write;

use anyhow::{anyhow, Result};

use crate::callable::{CallableCounts, CallableState};
use crate::coverage::{CoverageSummary, STANDARD_DEPTH_THRESHOLDS};
use crate::genomics::ReadStats;
use crate::result::CoverageCallableResult;

/// Scope label of the genome-wide summary row.
pub const GENOME_SCOPE: &str = "genome";

fn summary_header() -> String {
    let mut columns = vec!["contig".to_string(), "length".to_string(), "positions".to_string()];
    columns.extend(CallableState::ALL.iter().map(|state| state.label().to_string()));
    columns.extend(["mean_depth", "median_depth", "stddev_depth"].map(String::from));
    columns.extend(STANDARD_DEPTH_THRESHOLDS.iter().map(|depth| format!("pct_{depth}x")));
    columns.join("\t") + "\n"
}

fn summary_row(name: &str, length: u64, coverage: &CoverageSummary, callable: &CallableCounts) -> String {
    let mut fields = vec![name.to_string(), length.to_string(), coverage.positions.to_string()];
    fields.extend(callable.iter().map(|(_, count)| count.to_string()));
    fields.push(format!("{:.2}", coverage.mean));
    fields.push(coverage.median.to_string());
    fields.push(format!("{:.2}", coverage.stddev));
    fields.extend(
        coverage
            .fraction_at
            .iter()
            .map(|entry| format!("{:.2}", entry.fraction * 100.0)),
    );
    fields.join("\t") + "\n"
}

/// Write one row per contig followed by the genome row.
pub fn write_summary<W: Write>(writer: &mut W, result: &CoverageCallableResult) -> Result<()> {
    writer.write_all(summary_header().as_bytes())?;

    for contig in result.contigs() {
        let row = summary_row(&contig.name, contig.length, &contig.coverage, &contig.callable);
        writer.write_all(row.as_bytes())?;
    }

    let genome_length = result.contigs().iter().map(|contig| contig.length).sum();
    let row = summary_row(GENOME_SCOPE, genome_length, result.coverage(), result.callable());
    writer.write_all(row.as_bytes())?;

    writer.flush()?;
    Ok(())
}

/// Render the summary table into a string.
pub fn render_summary(result: &CoverageCallableResult) -> Result<String> {
    let mut buffer = Vec::new();
    write_summary(&mut buffer, result)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered summary is not valid UTF-8"))
}

/// Write the depth histogram: one row per depth, one column per scope.
///
/// Rows stop at the deepest bin observed genome-wide; bin 255 holds every
/// deeper position.
pub fn write_histogram<W: Write>(writer: &mut W, result: &CoverageCallableResult) -> Result<()> {
    let mut header = format!("depth\t{GENOME_SCOPE}");
    for contig in result.contigs() {
        header.push('\t');
        header.push_str(&contig.name);
    }
    header.push('\n');
    writer.write_all(header.as_bytes())?;

    let Some(max_depth) = result.coverage().histogram.max_observed() else {
        writer.flush()?;
        return Ok(());
    };
    for depth in 0..=max_depth as usize {
        let mut row = format!("{depth}\t{}", result.coverage().histogram.bins()[depth]);
        for contig in result.contigs() {
            row.push('\t');
            row.push_str(&contig.coverage.histogram.bins()[depth].to_string());
        }
        row.push('\n');
        writer.write_all(row.as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// Render the depth histogram into a string.
pub fn render_histogram(result: &CoverageCallableResult) -> Result<String> {
    let mut buffer = Vec::new();
    write_histogram(&mut buffer, result)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered histogram is not valid UTF-8"))
}

/// Write read-level figures as `metric<TAB>value` lines.
pub fn write_read_stats<W: Write>(writer: &mut W, stats: &ReadStats) -> Result<()> {
    let rows = [
        ("total_reads", stats.total_reads.to_string()),
        ("primary_reads", stats.primary_reads.to_string()),
        ("aligned_reads", stats.aligned_reads.to_string()),
        ("paired_reads", stats.paired_reads.to_string()),
        ("properly_paired_reads", stats.properly_paired_reads.to_string()),
        ("duplicate_reads", stats.duplicate_reads.to_string()),
        ("alignment_rate", format!("{:.4}", stats.alignment_rate())),
        ("proper_pair_rate", format!("{:.4}", stats.proper_pair_rate())),
        ("duplicate_rate", format!("{:.4}", stats.duplicate_rate())),
        ("mean_read_length", format!("{:.2}", stats.mean_read_length)),
        ("insert_size_pairs", stats.insert_size.pairs.to_string()),
        ("insert_size_mean", format!("{:.2}", stats.insert_size.mean)),
        ("insert_size_median", format!("{:.2}", stats.insert_size.median)),
        ("insert_size_stddev", format!("{:.2}", stats.insert_size.stddev)),
    ];
    for (metric, value) in rows {
        writeln!(writer, "{metric}\t{value}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Render read-level figures into a string.
pub fn render_read_stats(stats: &ReadStats) -> Result<String> {
    let mut buffer = Vec::new();
    write_read_stats(&mut buffer, stats)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered read stats are not valid UTF-8"))
}

/// blake3 digest over every rendered table; equal digests mean equal outputs.
pub fn fingerprint(result: &CoverageCallableResult) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(render_summary(result)?.as_bytes());
    hasher.update(render_histogram(result)?.as_bytes());
    if let Some(stats) = result.read_stats() {
        hasher.update(render_read_stats(stats)?.as_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}
