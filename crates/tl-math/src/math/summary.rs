//! Running mean/min/max/count accumulators.

use super::stable::StableSum;
use serde::{Deserialize, Serialize};

/// Final statistics over a group of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Single-pass accumulator behind [`Summary`].
///
/// Memory stays constant regardless of how many samples are pushed, which
/// keeps per-bucket state bounded on very large inputs.
#[derive(Debug, Clone, Default)]
pub struct RunningSummary {
    count: u64,
    sum: StableSum,
    min: f64,
    max: f64,
}

impl RunningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum.add(value);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean of the pushed samples, `None` if nothing was pushed.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum.value() / self.count as f64)
        }
    }

    /// Snapshot the accumulator. `None` if nothing was pushed.
    pub fn finish(&self) -> Option<Summary> {
        Some(Summary {
            count: self.count,
            mean: self.mean()?,
            min: self.min,
            max: self.max,
        })
    }
}

impl Extend<f64> for RunningSummary {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.push(v);
        }
    }
}

impl FromIterator<f64> for RunningSummary {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = RunningSummary::new();
        acc.extend(iter);
        acc
    }
}
