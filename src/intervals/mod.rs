//! Interval coalescing of per-position callable states and the per-contig
//! TSV interval files consumed by visualization.

mod coalescer;
mod tsv;

pub use coalescer::{coalesce, expand_intervals, Interval, IntervalCoalescer, IntervalError};
pub use tsv::{
    format_interval, interval_file_name, read_intervals, render_intervals, IntervalWriter,
    INTERVAL_FILE_SUFFIX,
};
