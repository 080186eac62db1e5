//! Cursor-anchored zoom along X.

use super::{Chart, DEFAULT_ZOOM_FACTOR, MIN_ZOOM_RANGE, TAIL_ANCHOR_MOUSE_THRESHOLD};

/// Wheel direction of a zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl Chart {
    /// Zoom the X view around the cursor.
    ///
    /// `mouse_x` is a column relative to the plot area. The data value under
    /// the cursor stays under the cursor, except that zooming in at the right
    /// edge keeps the newest sample in view.
    pub fn handle_zoom(&mut self, direction: ZoomDirection, mouse_x: usize) {
        let graph_width = self.viewport.graph_width();
        if graph_width == 0 {
            return;
        }
        let vmin = self.viewport.view_min_x();
        let vmax = self.viewport.view_max_x();
        let range = vmax - vmin;
        if range <= 0.0 {
            return;
        }

        let prop = (mouse_x as f64 / graph_width as f64).clamp(0.0, 1.0);
        let step_under_mouse = vmin + prop * range;

        let factor = match direction {
            ZoomDirection::In => 1.0 - DEFAULT_ZOOM_FACTOR,
            ZoomDirection::Out => 1.0 + DEFAULT_ZOOM_FACTOR,
        };
        let domain_width = self.viewport.domain_width();
        let new_range = (range * factor).max(MIN_ZOOM_RANGE).min(domain_width);

        let mut new_min = step_under_mouse - new_range * prop;
        let mut new_max = step_under_mouse + new_range * (1.0 - prop);

        if direction == ZoomDirection::In && prop >= TAIL_ANCHOR_MOUSE_THRESHOLD {
            // Two cells of slack past the newest sample.
            let right_pad = self.viewport.pixel_eps_x(new_range) * 2.0;
            if self.x_max.is_finite() && new_max < self.x_max - right_pad {
                new_max = self.x_max + right_pad;
                new_min = new_max - new_range;
            }
        }

        let (lo, hi) = (self.viewport.min_x(), self.viewport.max_x());
        if new_min < lo {
            new_min = lo;
            new_max = (new_min + new_range).min(hi);
        }
        if new_max > hi {
            new_max = hi;
            new_min = (new_max - new_range).max(lo);
        }

        self.viewport.set_view_x_range(new_min, new_max);
        self.is_zoomed = true;
        self.dirty = true;

        if self.inspection.active {
            self.refresh_inspection_after_view_change();
        }
    }

    /// Drop the zoom so the view tracks the full domain again.
    pub fn reset_zoom(&mut self) {
        if !self.is_zoomed {
            return;
        }
        self.is_zoomed = false;
        let (lo, hi) = (self.viewport.min_x(), self.viewport.max_x());
        self.viewport.set_view_x_range(lo, hi);
        self.dirty = true;
        if self.inspection.active {
            self.refresh_inspection_after_view_change();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::MetricData;

    fn chart(points: usize, width: usize, height: usize) -> Chart {
        let mut chart = Chart::new("loss");
        chart.resize(width, height);
        let xs: Vec<f64> = (0..points).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (x * 0.1).sin()).collect();
        chart.add_data("main", &MetricData::new(xs, ys));
        chart
    }

    fn view(chart: &Chart) -> (f64, f64) {
        (chart.viewport().view_min_x(), chart.viewport().view_max_x())
    }

    #[test]
    fn test_zoom_in_keeps_cursor_value() {
        let mut chart = chart(101, 60, 12);
        let gw = chart.graph_width();
        let mouse = gw / 2;

        let (vmin, vmax) = view(&chart);
        let prop = mouse as f64 / gw as f64;
        let before = vmin + prop * (vmax - vmin);

        chart.handle_zoom(ZoomDirection::In, mouse);
        let (nmin, nmax) = view(&chart);
        let after = nmin + prop * (nmax - nmin);

        assert!(chart.is_zoomed());
        assert!((before - after).abs() < 1e-9);
        assert!(((nmax - nmin) - (vmax - vmin) * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_respects_min_range() {
        let mut chart = chart(101, 60, 12);
        for _ in 0..200 {
            chart.handle_zoom(ZoomDirection::In, 10);
        }
        let (nmin, nmax) = view(&chart);
        assert!((nmax - nmin - MIN_ZOOM_RANGE).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_out_clamps_to_domain() {
        let mut chart = chart(101, 60, 12);
        chart.handle_zoom(ZoomDirection::In, 5);
        for _ in 0..50 {
            chart.handle_zoom(ZoomDirection::Out, 5);
        }
        let (nmin, nmax) = view(&chart);
        let vp = chart.viewport();
        assert!(nmin >= vp.min_x() && nmax <= vp.max_x());
        assert!((nmax - nmin - vp.domain_width()).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_in_at_right_edge_follows_tail() {
        let mut chart = chart(95, 60, 12);
        let gw = chart.graph_width();
        // Domain is [0, 100] while the newest sample sits at 94.
        for _ in 0..10 {
            chart.handle_zoom(ZoomDirection::In, gw - 1);
        }
        let (_, nmax) = view(&chart);
        assert!(nmax >= 94.0, "tail left the view: max={nmax}");
    }

    #[test]
    fn test_zoom_survives_ingestion() {
        let mut chart = chart(101, 60, 12);
        chart.handle_zoom(ZoomDirection::In, 10);
        let zoomed = view(&chart);

        chart.add_data("main", &MetricData::point(150.0, 0.5));
        assert_eq!(chart.viewport().max_x(), 150.0);
        assert_eq!(view(&chart), zoomed);
    }

    #[test]
    fn test_reset_zoom() {
        let mut chart = chart(101, 60, 12);
        chart.handle_zoom(ZoomDirection::In, 10);
        chart.reset_zoom();
        assert!(!chart.is_zoomed());
        assert_eq!(view(&chart), (0.0, 100.0));
    }

    #[test]
    fn test_zoom_without_graph_area_is_noop() {
        let mut chart = Chart::new("loss");
        chart.add_data("main", &MetricData::point(1.0, 1.0));
        chart.handle_zoom(ZoomDirection::In, 0);
        assert!(!chart.is_zoomed());
    }
}
