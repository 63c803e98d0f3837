//! Uniform stride downsampling with endpoint preservation.
//!
//! A line or bar chart needs the visual trend, not every extremum, so the
//! sample takes every `step`-th point and then patches the tail so the
//! series never loses its true last point.

use std::cmp::Ordering;

/// A point that can be placed on a time axis.
pub trait TimeOrdered {
    /// Position on the axis, in epoch seconds.
    fn timestamp(&self) -> f64;

    /// Tie-breaker when timestamps are equal.
    fn label(&self) -> &str;
}

fn chronological<T: TimeOrdered>(a: &T, b: &T) -> Ordering {
    a.timestamp()
        .total_cmp(&b.timestamp())
        .then_with(|| a.label().cmp(b.label()))
}

/// Reduce `points` to at most `max_points` elements.
///
/// Inputs that already fit are returned as-is. Otherwise the points are
/// sorted chronologically and sampled every `ceil(n / max_points)` elements;
/// the last sampled element is replaced by the true last point when they
/// differ. A budget of zero is treated as one. With a budget of one the
/// first and last points are both kept.
pub fn downsample<T: TimeOrdered>(mut points: Vec<T>, max_points: usize) -> Vec<T> {
    let budget = max_points.max(1);
    let n = points.len();
    if n <= budget {
        return points;
    }

    points.sort_by(chronological);
    let step = n.div_ceil(budget);
    let last = n - 1;

    let mut sampled = Vec::with_capacity(n.div_ceil(step) + 1);
    let mut tail = None;
    for (i, point) in points.into_iter().enumerate() {
        if i % step == 0 {
            sampled.push(point);
        } else if i == last {
            tail = Some(point);
        }
    }

    if let Some(point) = tail {
        if sampled.len() == 1 {
            sampled.push(point);
        } else if let Some(slot) = sampled.last_mut() {
            *slot = point;
        }
    }
    sampled
}
