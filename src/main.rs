use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use callable_loci::report::{write_histogram, write_read_stats, write_summary};
use callable_loci::{
    AnalysisConfig, AnalysisOutcome, CallableLociAnalyzer, CallableParams, HtsInputs,
    ProgressCallback,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "callable-loci",
    about = "Coverage statistics and callable-state intervals from indexed BAM/CRAM files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Indexed alignment file (BAM with .bai/.csi, CRAM with .crai).
    alignment: PathBuf,
    /// Indexed reference FASTA (.fai next to it).
    reference: PathBuf,
    /// Maximum reads per pileup column passed to htslib.
    #[arg(long, default_value_t = callable_loci::genomics::DEFAULT_PILEUP_DEPTH_LIMIT)]
    depth_limit: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every position and gather coverage statistics.
    Analyze {
        #[command(flatten)]
        inputs: InputArgs,
        /// Directory receiving one `<contig>.callable.tsv` per contig.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Summary table output (stdout when omitted).
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Depth histogram output.
        #[arg(long)]
        histogram: Option<PathBuf>,
        /// Minimum QC-passing depth for CALLABLE.
        #[arg(long, default_value_t = 4)]
        min_depth: u32,
        /// Minimum mapping quality counted towards QC depth.
        #[arg(long, default_value_t = 10)]
        min_mapping_quality: u8,
        /// Minimum base quality counted towards QC depth.
        #[arg(long, default_value_t = 20)]
        min_base_quality: u8,
        /// Reads at or below this mapping quality are low-MAPQ.
        #[arg(long, default_value_t = 1)]
        max_low_mapq: u8,
        /// Largest tolerated fraction of low-MAPQ reads.
        #[arg(long, default_value_t = 0.1)]
        max_fraction_low_mapq: f64,
        /// QC depth above which a position is EXCESSIVE_COVERAGE.
        #[arg(long)]
        max_depth: Option<u32>,
        /// Worker threads for the pileup pass.
        #[arg(long, default_value_t = 1)]
        threads: usize,
        /// Restrict to these contigs (repeatable).
        #[arg(long = "contig")]
        contigs: Vec<String>,
        /// Skip the read-level pass.
        #[arg(long)]
        no_read_stats: bool,
        /// Run the read-level and pileup passes concurrently.
        #[arg(long)]
        concurrent_passes: bool,
    },
    /// Alignment, pairing and insert-size figures only.
    ReadStats {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            inputs,
            out_dir,
            summary,
            histogram,
            min_depth,
            min_mapping_quality,
            min_base_quality,
            max_low_mapq,
            max_fraction_low_mapq,
            max_depth,
            threads,
            contigs,
            no_read_stats,
            concurrent_passes,
        } => {
            let params = CallableParams::default()
                .with_min_depth(min_depth)
                .with_min_mapping_quality(min_mapping_quality)
                .with_min_base_quality(min_base_quality)
                .with_max_low_mapq(max_low_mapq)
                .with_max_fraction_low_mapq(max_fraction_low_mapq)
                .with_max_depth(max_depth);
            let mut config = AnalysisConfig::default()
                .with_params(params)
                .with_threads(threads)
                .with_read_stats(!no_read_stats)
                .with_concurrent_passes(concurrent_passes);
            if let Some(dir) = out_dir {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create output directory {}", dir.display()))?;
                config = config.with_interval_dir(dir);
            }
            if !contigs.is_empty() {
                config = config.with_contigs(contigs);
            }
            run_analyze(&inputs, config, summary, histogram)?
        }
        Commands::ReadStats { inputs } => run_read_stats(&inputs)?,
    }

    Ok(())
}

fn open_inputs(args: &InputArgs) -> Result<HtsInputs> {
    let inputs = HtsInputs::open(&args.alignment, &args.reference).with_context(|| {
        format!(
            "failed to open {} against {}",
            args.alignment.display(),
            args.reference.display()
        )
    })?;
    Ok(inputs.with_depth_limit(args.depth_limit))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn run_analyze(
    args: &InputArgs,
    config: AnalysisConfig,
    summary: Option<PathBuf>,
    histogram: Option<PathBuf>,
) -> Result<()> {
    let inputs = open_inputs(args)?;
    let progress: ProgressCallback = Arc::new(|contig: &str, done: u64, total: u64| {
        let percent = if total == 0 { 100.0 } else { done as f64 * 100.0 / total as f64 };
        info!(contig, done, total, "{percent:.1}% of positions processed");
    });
    let analyzer = CallableLociAnalyzer::new(inputs, config)
        .context("invalid analysis configuration")?
        .with_progress(progress);

    let outcome = analyzer
        .run()
        .with_context(|| format!("analysis of {} failed", args.alignment.display()))?;
    let result = match &outcome {
        AnalysisOutcome::Complete(result) => result,
        AnalysisOutcome::Cancelled(partial) => {
            warn!("analysis stopped early; tables cover visited positions only");
            partial.result()
        }
    };

    match summary {
        Some(path) => write_summary(&mut create_output(&path)?, result)
            .with_context(|| format!("failed to write summary to {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_summary(&mut handle, result).context("failed to write summary")?;
        }
    }
    if let Some(path) = histogram {
        write_histogram(&mut create_output(&path)?, result)
            .with_context(|| format!("failed to write histogram to {}", path.display()))?;
    }
    if let Some(stats) = result.read_stats() {
        info!(
            total = stats.total_reads,
            alignment_rate = stats.alignment_rate(),
            proper_pair_rate = stats.proper_pair_rate(),
            insert_size_median = stats.insert_size.median,
            "read-level statistics"
        );
    }
    for path in result.interval_files() {
        info!(file = %path.display(), "intervals written");
    }

    Ok(())
}

fn run_read_stats(args: &InputArgs) -> Result<()> {
    let inputs = open_inputs(args)?;
    let analyzer = CallableLociAnalyzer::new(inputs, AnalysisConfig::default())
        .context("invalid analysis configuration")?;
    let stats = analyzer
        .run_read_pass()
        .with_context(|| format!("read pass over {} failed", args.alignment.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_read_stats(&mut handle, &stats).context("failed to write read statistics")?;
    handle.flush()?;
    Ok(())
}
