/// Highest depth with its own bin; deeper positions land here.
pub const MAX_DEPTH_BIN: usize = 255;

/// Depth thresholds reported as "fraction of positions at >= N×".
pub const STANDARD_DEPTH_THRESHOLDS: [u32; 14] =
    [1, 5, 10, 15, 20, 25, 30, 40, 50, 60, 70, 80, 90, 100];

/// Per-depth position counts, saturating at [`MAX_DEPTH_BIN`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct DepthHistogram {
    bins: Vec<u64>,
}

impl Default for DepthHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthHistogram {
    /// Empty histogram.
    pub fn new() -> Self {
        Self {
            bins: vec![0; MAX_DEPTH_BIN + 1],
        }
    }

    /// Record one position at `depth`.
    pub fn observe(&mut self, depth: u32) {
        let bin = (depth as usize).min(MAX_DEPTH_BIN);
        self.bins[bin] += 1;
    }

    /// Add another histogram bin-wise.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.bins.iter_mut().zip(other.bins.iter()) {
            *mine += theirs;
        }
    }

    /// Bin counts indexed by depth.
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    /// Positions recorded.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Positions with depth above zero.
    pub fn covered(&self) -> u64 {
        self.total() - self.bins[0]
    }

    /// Fraction of positions with depth `>= depth`; 0 for an empty histogram.
    ///
    /// Depths saturate at [`MAX_DEPTH_BIN`], so any threshold above it is
    /// answered as the fraction at `>= MAX_DEPTH_BIN`, an upper bound of the
    /// true value.
    pub fn fraction_at_least(&self, depth: u32) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let start = (depth as usize).min(MAX_DEPTH_BIN);
        let at_least: u64 = self.bins[start..].iter().sum();
        at_least as f64 / total as f64
    }

    /// Lower median depth; 0 for an empty histogram.
    pub fn median(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let rank = (total - 1) / 2;
        let mut seen = 0u64;
        for (depth, &count) in self.bins.iter().enumerate() {
            seen += count;
            if seen > rank {
                return depth as u32;
            }
        }
        MAX_DEPTH_BIN as u32
    }

    /// Largest depth bin holding at least one position.
    pub fn max_observed(&self) -> Option<u32> {
        self.bins.iter().rposition(|&count| count > 0).map(|d| d as u32)
    }
}
