use std::sync::Arc;

use thiserror::Error;

use crate::callable::CallableState;

/// Run of consecutive positions sharing a callable state.
///
/// Coordinates are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct Interval {
    /// Contig name.
    #[cfg_attr(feature = "visualize", serde(serialize_with = "crate::genomics::serialize_arc_str"))]
    pub contig: Arc<str>,
    /// First position (1-based).
    pub start: u64,
    /// Last position (1-based, inclusive).
    pub end: u64,
    /// State shared by every position in the run.
    pub state: CallableState,
}

impl Interval {
    /// Construct an interval.
    pub fn new(contig: impl Into<Arc<str>>, start: u64, end: u64, state: CallableState) -> Self {
        Self {
            contig: contig.into(),
            start,
            end,
            state,
        }
    }

    /// Number of positions covered.
    pub fn length(&self) -> u64 {
        self.end + 1 - self.start
    }
}

/// Errors from interval coalescing and interval files.
#[derive(Debug, Error)]
pub enum IntervalError {
    /// Positions must arrive contiguously and in order.
    #[error("{contig}: position {position} does not follow {previous}")]
    OutOfOrder {
        /// Contig being coalesced.
        contig: String,
        /// Previous 0-based position.
        previous: u64,
        /// Offending 0-based position.
        position: u64,
    },

    /// Failed to read or write an interval file.
    #[error("interval file {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in an interval file.
    #[error("interval file {path} line {line}: {message}")]
    Parse {
        /// File involved.
        path: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
struct OpenRun {
    start: u64,
    last: u64,
    state: CallableState,
}

/// Turns an ordered per-position state stream of one contig into intervals.
#[derive(Debug)]
pub struct IntervalCoalescer {
    contig: Arc<str>,
    open: Option<OpenRun>,
    emitted: u64,
}

impl IntervalCoalescer {
    /// Start coalescing a contig.
    pub fn new(contig: impl Into<Arc<str>>) -> Self {
        Self {
            contig: contig.into(),
            open: None,
            emitted: 0,
        }
    }

    /// Feed the state of 0-based `position`.
    ///
    /// Returns the interval closed by a state change, if any.
    pub fn push(&mut self, position: u64, state: CallableState) -> Result<Option<Interval>, IntervalError> {
        let Some(run) = self.open.as_mut() else {
            self.open = Some(OpenRun {
                start: position,
                last: position,
                state,
            });
            return Ok(None);
        };

        if position != run.last + 1 {
            return Err(IntervalError::OutOfOrder {
                contig: self.contig.to_string(),
                previous: run.last,
                position,
            });
        }

        if run.state == state {
            run.last = position;
            return Ok(None);
        }

        let closed = *run;
        *run = OpenRun {
            start: position,
            last: position,
            state,
        };
        Ok(Some(self.close(closed)))
    }

    /// Flush the open run, if any.
    pub fn finish(&mut self) -> Option<Interval> {
        self.open.take().map(|run| self.close(run))
    }

    /// Intervals emitted so far (including by `finish`).
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn close(&mut self, run: OpenRun) -> Interval {
        self.emitted += 1;
        Interval::new(Arc::clone(&self.contig), run.start + 1, run.last + 1, run.state)
    }
}

/// Re-expand intervals into per-position `(0-based position, state)` pairs.
pub fn expand_intervals(intervals: &[Interval]) -> impl Iterator<Item = (u64, CallableState)> + '_ {
    intervals
        .iter()
        .flat_map(|interval| (interval.start - 1..interval.end).map(move |pos| (pos, interval.state)))
}

/// Coalesce a complete state slice starting at position 0.
pub fn coalesce(contig: &str, states: &[CallableState]) -> Vec<Interval> {
    let mut coalescer = IntervalCoalescer::new(contig);
    let mut intervals = Vec::new();
    for (pos, &state) in states.iter().enumerate() {
        // positions are generated contiguously, so push cannot fail
        if let Ok(Some(interval)) = coalescer.push(pos as u64, state) {
            intervals.push(interval);
        }
    }
    intervals.extend(coalescer.finish());
    intervals
}
