//! Compensated summation.
//!
//! Telemetry buckets can hold hundreds of thousands of samples with values
//! spanning several orders of magnitude, so plain left-to-right summation
//! drifts. [`StableSum`] uses Neumaier's variant of Kahan summation.

/// Running compensated sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StableSum {
    sum: f64,
    compensation: f64,
}

impl StableSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample. Once the sum is infinite or NaN the compensation
    /// is no longer meaningful, so plain IEEE addition takes over.
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if !t.is_finite() || !value.is_finite() {
            self.sum = t;
            return;
        }
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        if self.sum.is_finite() {
            self.sum + self.compensation
        } else {
            self.sum
        }
    }
}
