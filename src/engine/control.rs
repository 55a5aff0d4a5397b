use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running analysis to stop at its next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observer receiving `(message, positions_processed, positions_total)`.
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Shared progress counter and cancellation check of one run.
pub(crate) struct RunControl {
    token: CancellationToken,
    progress: Option<ProgressCallback>,
    processed: AtomicU64,
    total: u64,
    check_interval: u64,
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("cancelled", &self.token.is_cancelled())
            .field("processed", &self.processed.load(Ordering::Relaxed))
            .field("total", &self.total)
            .field("check_interval", &self.check_interval)
            .finish()
    }
}

impl RunControl {
    pub(crate) fn new(
        token: CancellationToken,
        progress: Option<ProgressCallback>,
        total: u64,
        check_interval: u64,
    ) -> Self {
        Self {
            token,
            progress,
            processed: AtomicU64::new(0),
            total,
            check_interval: check_interval.max(1),
        }
    }

    pub(crate) fn check_interval(&self) -> u64 {
        self.check_interval
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Account for `positions` more positions, report, and poll the token.
    pub(crate) fn checkpoint(&self, contig: &str, positions: u64) -> bool {
        self.advance(contig, positions);
        self.is_cancelled()
    }

    /// Report the end of a contig.
    pub(crate) fn contig_done(&self, contig: &str, positions: u64) {
        self.advance(contig, positions);
    }

    fn advance(&self, contig: &str, positions: u64) {
        let processed = self.processed.fetch_add(positions, Ordering::Relaxed) + positions;
        if let Some(progress) = &self.progress {
            progress(contig, processed, self.total);
        }
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}
