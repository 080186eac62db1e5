//! Series store: per-series sample buffers with running bounds.

use std::collections::BTreeMap;
use std::ops::Range;

use ratatui::style::Style;
use serde::{Deserialize, Serialize};

use crate::palette::StyleHandle;

/// Initial capacity of a series' sample buffers.
const INIT_DATA_CAP: usize = 256;

/// A batch of samples for one series.
///
/// `x` is usually `_step` and must be non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl MetricData {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    /// A single sample.
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            x: vec![x],
            y: vec![y],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One ingestion batch: metric name -> samples.
pub type HistoryBatch = BTreeMap<String, MetricData>;

/// Raw samples of one series in arrival order.
#[derive(Debug)]
pub struct Series {
    x: Vec<f64>,
    y: Vec<f64>,

    /// Read by the render pass while the grid may swap it after a re-sort.
    style: StyleHandle,

    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Series {
    pub fn new(style: Style) -> Self {
        Self::with_handle(StyleHandle::new(style))
    }

    /// Create a series drawing with an existing shared style slot.
    pub fn with_handle(style: StyleHandle) -> Self {
        Self {
            x: Vec::with_capacity(INIT_DATA_CAP),
            y: Vec::with_capacity(INIT_DATA_CAP),
            style,
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        }
    }

    /// Append samples. Mismatched lengths are truncated to the shorter side.
    pub fn append(&mut self, xs: &[f64], ys: &[f64]) {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return;
        }
        if xs.len() != ys.len() {
            tracing::debug!(x = xs.len(), y = ys.len(), "series batch length mismatch, truncating");
        }
        let (xs, ys) = (&xs[..n], &ys[..n]);

        self.x.extend_from_slice(xs);
        self.y.extend_from_slice(ys);
        self.update_bounds(xs, ys);
    }

    /// Extend the bounds with a new batch (new samples only).
    fn update_bounds(&mut self, xs: &[f64], ys: &[f64]) {
        let (x_lo, x_hi) = min_max(xs);
        let (y_lo, y_hi) = min_max(ys);
        self.x_min = self.x_min.min(x_lo);
        self.x_max = self.x_max.max(x_hi);
        self.y_min = self.y_min.min(y_lo);
        self.y_max = self.y_max.max(y_hi);
    }

    /// `(x_min, x_max, y_min, y_max)`; infinite sentinels while empty.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.x_max, self.y_min, self.y_max)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn style(&self) -> Style {
        self.style.load()
    }

    pub fn set_style(&self, style: Style) {
        self.style.store(style);
    }

    pub fn style_handle(&self) -> &StyleHandle {
        &self.style
    }

    /// Index range of samples whose X lies in `[min, max + eps]`.
    pub fn visible_range(&self, min: f64, max: f64, eps: f64) -> Range<usize> {
        visible_range(&self.x, min, max, eps)
    }
}

/// Non-finite values are skipped; a batch without finite values leaves the
/// sentinels untouched.
fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Binary search the visible window over non-decreasing `xs`.
///
/// `eps` (about one pixel in data units) keeps a sample sitting exactly at the
/// right edge from being dropped by floating-point rounding.
pub fn visible_range(xs: &[f64], min: f64, max: f64, eps: f64) -> Range<usize> {
    let lb = xs.partition_point(|&x| x < min);
    let ub = xs.partition_point(|&x| x <= max + eps);
    if ub <= lb {
        return lb..lb;
    }
    lb..ub
}

/// Index of the sample in non-decreasing `xs` closest to `target`.
///
/// Equidistant neighbours resolve to the lower index.
pub fn nearest_index_for_x(xs: &[f64], target: f64) -> Option<usize> {
    if xs.is_empty() {
        return None;
    }
    let j = xs.partition_point(|&x| x < target);

    let mut best: Option<usize> = None;
    let mut best_dist = f64::INFINITY;
    for i in [j.wrapping_sub(1), j, j + 1] {
        if i >= xs.len() {
            continue;
        }
        let d = (xs[i] - target).abs();
        if d < best_dist {
            best_dist = d;
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_updates_bounds() {
        let mut s = Series::new(Style::default());
        assert!(s.bounds().0.is_infinite());

        s.append(&[0.0, 1.0, 2.0], &[0.5, -1.0, 3.0]);
        assert_eq!(s.bounds(), (0.0, 2.0, -1.0, 3.0));

        s.append(&[3.0], &[1.0]);
        assert_eq!(s.bounds(), (0.0, 3.0, -1.0, 3.0));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_append_truncates_mismatch() {
        let mut s = Series::new(Style::default());
        s.append(&[0.0, 1.0, 2.0], &[5.0]);
        assert_eq!(s.x(), &[0.0]);
        assert_eq!(s.y(), &[5.0]);

        s.append(&[], &[1.0]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_bounds_skip_non_finite() {
        let mut s = Series::new(Style::default());
        s.append(&[1.0, 2.0, 3.0], &[0.5, f64::INFINITY, f64::NAN]);
        assert_eq!(s.bounds(), (1.0, 3.0, 0.5, 0.5));
        assert_eq!(s.len(), 3);

        let mut only_inf = Series::new(Style::default());
        only_inf.append(&[0.0], &[f64::NEG_INFINITY]);
        assert!(only_inf.bounds().2.is_infinite());
    }

    #[test]
    fn test_bounds_only_widen() {
        let mut s = Series::new(Style::default());
        s.append(&[10.0, 20.0], &[5.0, 6.0]);
        let before = s.bounds();
        s.append(&[21.0], &[5.5]);
        let after = s.bounds();
        assert!(after.0 <= before.0 && after.1 >= before.1);
        assert!(after.2 <= before.2 && after.3 >= before.3);
    }

    #[test]
    fn test_nearest_tie_breaks_low() {
        let xs = [0.0, 2.0, 4.0, 6.0, 8.0];
        assert_eq!(nearest_index_for_x(&xs, 3.0), Some(1));
        assert_eq!(nearest_index_for_x(&xs, 3.1), Some(2));
        assert_eq!(nearest_index_for_x(&xs, -5.0), Some(0));
        assert_eq!(nearest_index_for_x(&xs, 100.0), Some(4));
        assert_eq!(nearest_index_for_x(&xs, 6.0), Some(3));
        assert_eq!(nearest_index_for_x(&[], 1.0), None);
    }

    #[test]
    fn test_visible_range() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(visible_range(&xs, 1.0, 3.0, 0.0), 1..4);
        assert_eq!(visible_range(&xs, 1.5, 3.0, 0.0), 2..4);
        assert_eq!(visible_range(&xs, 10.0, 20.0, 0.0), 6..6);
        // A sample a hair past the right edge survives with epsilon.
        let xs = [0.0, 1.0, 2.000_000_000_1];
        assert_eq!(visible_range(&xs, 0.0, 2.0, 0.01), 0..3);
        assert_eq!(visible_range(&xs, 0.0, 2.0, 0.0), 0..2);
    }
}
