//! Fixed-width time buckets and the time-window filter.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// One bucket: its start in epoch seconds and a UTC display label.
///
/// Ordering is by start, then label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bucket {
    pub start: i64,
    pub label: String,
}

/// Maps epoch seconds onto fixed-width buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucketing {
    width_secs: i64,
}

impl Default for Bucketing {
    fn default() -> Self {
        Self::minute()
    }
}

impl Bucketing {
    /// Bucket width in seconds; widths below one second are clamped to one.
    pub fn new(width_secs: i64) -> Self {
        Self {
            width_secs: width_secs.max(1),
        }
    }

    pub fn minute() -> Self {
        Self { width_secs: 60 }
    }

    pub fn width_secs(&self) -> i64 {
        self.width_secs
    }

    /// Start of the bucket containing `t`.
    pub fn start_of(&self, t: f64) -> i64 {
        let width = self.width_secs;
        // `as` saturates for out-of-range and non-finite values.
        let index = (t / width as f64).floor() as i64;
        index.saturating_mul(width)
    }

    /// Display label for a bucket start.
    pub fn label(&self, start: i64) -> String {
        let format = if self.width_secs % 60 == 0 {
            "%Y-%m-%d %H:%M"
        } else {
            "%Y-%m-%d %H:%M:%S"
        };
        match DateTime::from_timestamp(start, 0) {
            Some(dt) => dt.format(format).to_string(),
            None => start.to_string(),
        }
    }

    pub fn bucket(&self, t: f64) -> Bucket {
        let start = self.start_of(t);
        Bucket {
            start,
            label: self.label(start),
        }
    }
}

/// Closed time range in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `start - pad <= t <= end + pad`.
    pub fn contains(&self, t: f64, pad: f64) -> bool {
        t >= self.start - pad && t <= self.end + pad
    }

    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start <= self.end
    }
}
