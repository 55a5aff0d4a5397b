use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Interval, IntervalError};
use crate::callable::CallableState;

/// Suffix of per-contig interval files.
pub const INTERVAL_FILE_SUFFIX: &str = ".callable.tsv";

/// File name used for a contig's intervals.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced by `_` so names such as
/// `HLA-A*01:01` stay portable.
pub fn interval_file_name(contig: &str) -> String {
    let stem: String = contig
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}{INTERVAL_FILE_SUFFIX}")
}

/// Format one interval as a TSV line (with trailing newline).
pub fn format_interval(interval: &Interval) -> String {
    format!(
        "{}\t{}\t{}\t{}\n",
        interval.contig, interval.start, interval.end, interval.state
    )
}

/// Streaming writer of one contig's interval file.
#[derive(Debug)]
pub struct IntervalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl IntervalWriter {
    /// Create `<dir>/<contig>.callable.tsv`, truncating an existing file.
    pub fn create(dir: &Path, contig: &str) -> Result<Self, IntervalError> {
        let path = dir.join(interval_file_name(contig));
        let file = File::create(&path).map_err(|source| IntervalError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append an interval.
    pub fn write(&mut self, interval: &Interval) -> Result<(), IntervalError> {
        self.writer
            .write_all(format_interval(interval).as_bytes())
            .map_err(|source| self.io_error(source))?;
        self.written += 1;
        Ok(())
    }

    /// Flush and close, returning the file path.
    pub fn finish(mut self) -> Result<PathBuf, IntervalError> {
        self.writer.flush().map_err(|source| self.io_error(source))?;
        Ok(self.path)
    }

    /// Intervals written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn io_error(&self, source: std::io::Error) -> IntervalError {
        IntervalError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Render intervals as TSV text.
pub fn render_intervals(intervals: &[Interval]) -> String {
    intervals.iter().map(format_interval).collect()
}

/// Parse an interval file written by [`IntervalWriter`].
pub fn read_intervals(path: &Path) -> Result<Vec<Interval>, IntervalError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| IntervalError::Io {
        path: display.clone(),
        source,
    })?;

    let mut intervals = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| IntervalError::Io {
            path: display.clone(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let parse_error = |message: String| IntervalError::Parse {
            path: display.clone(),
            line: idx + 1,
            message,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let [contig, start, end, state] = fields[..] else {
            return Err(parse_error(format!("expected 4 columns, found {}", fields.len())));
        };
        let start: u64 = start
            .parse()
            .map_err(|_| parse_error(format!("invalid start '{start}'")))?;
        let end: u64 = end
            .parse()
            .map_err(|_| parse_error(format!("invalid end '{end}'")))?;
        if start == 0 || end < start {
            return Err(parse_error(format!("invalid range {start}-{end}")));
        }
        let state: CallableState = state.parse().map_err(|err| parse_error(format!("{err}")))?;
        intervals.push(Interval::new(contig, start, end, state));
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(interval_file_name("chr1"), "chr1.callable.tsv");
        assert_eq!(interval_file_name("HLA-A*01:01"), "HLA-A_01_01.callable.tsv");
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let intervals = vec![
            Interval::new("chr1", 1, 10, CallableState::NoCoverage),
            Interval::new("chr1", 11, 42, CallableState::Callable),
        ];

        let mut writer = IntervalWriter::create(dir.path(), "chr1").unwrap();
        for interval in &intervals {
            writer.write(interval).unwrap();
        }
        assert_eq!(writer.written(), 2);
        let path = writer.finish().unwrap();

        assert_eq!(read_intervals(&path).unwrap(), intervals);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "chr1\t1\t10\tNO_COVERAGE\nchr1\t11\t42\tCALLABLE\n"
        );
    }

    #[test]
    fn malformed_lines_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "chr1\t1\t10\tNO_COVERAGE\nchr1\t5\n").unwrap();
        let err = read_intervals(&path).unwrap_err();
        assert!(matches!(err, IntervalError::Parse { line: 2, .. }));
    }
}
