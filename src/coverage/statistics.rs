/// Running mean/variance using Welford's online update.
///
/// Two accumulators can be combined with [`RunningStats::merge`]; merging in a
/// fixed order gives identical results regardless of how work was scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of `count` identical observations of `value`.
    pub fn repeated(value: f64, count: u64) -> Self {
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            mean: value,
            m2: 0.0,
        }
    }

    /// Add one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Combine another accumulator into this one (Chan et al.).
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let left = self.count as f64;
        let right = other.count as f64;
        let total = left + right;
        let delta = other.mean - self.mean;
        self.mean += delta * right / total;
        self.m2 += other.m2 + delta * delta * left * right / total;
        self.count += other.count;
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean, 0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance, 0 with fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation.
    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}
