//! Crosshair inspection.
//!
//! The crosshair always sits on a sample of the topmost series: the cursor
//! column is resolved to the nearest sample in data space and then snapped
//! back to that sample's own column.

use super::Chart;
use crate::series::nearest_index_for_x;

/// Crosshair state of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Inspection {
    pub active: bool,
    /// Crosshair column relative to the plot area.
    pub mouse_x: usize,
    /// Anchor sample shared by every series' legend entry.
    pub data_x: f64,
    pub data_y: f64,
}

impl Chart {
    pub fn is_inspecting(&self) -> bool {
        self.inspection.active
    }

    pub fn inspection(&self) -> Inspection {
        self.inspection
    }

    /// Anchor `(x, y)` while inspecting.
    pub fn inspection_data(&self) -> Option<(f64, f64)> {
        self.inspection
            .active
            .then_some((self.inspection.data_x, self.inspection.data_y))
    }

    /// Begin inspecting at a plot-area column.
    pub fn start_inspection(&mut self, mouse_x: usize) {
        if self.topmost().map_or(true, |s| s.is_empty()) || self.graph_width() == 0 {
            return;
        }
        self.inspection.active = true;
        self.update_inspection(mouse_x);
    }

    /// Move the crosshair to the sample nearest a plot-area column.
    pub fn update_inspection(&mut self, mouse_x: usize) {
        if !self.inspection.active {
            return;
        }
        let gw = self.graph_width();
        if gw == 0 {
            return;
        }
        let mouse_x = mouse_x.min(gw - 1);

        let vmin = self.viewport.view_min_x();
        let vmax = self.viewport.view_max_x();
        let target = vmin + (mouse_x as f64 / gw as f64) * (vmax - vmin);
        self.snap_to_nearest(target);
    }

    /// Put the crosshair on the sample nearest a data X.
    ///
    /// Used to mirror another chart's inspection; starts inspecting if needed.
    pub fn inspect_at_data_x(&mut self, data_x: f64) {
        if self.topmost().map_or(true, |s| s.is_empty()) || self.graph_width() == 0 {
            return;
        }
        self.inspection.active = true;
        self.snap_to_nearest(data_x);
    }

    pub fn end_inspection(&mut self) {
        if !self.inspection.active {
            return;
        }
        self.inspection = Inspection::default();
        self.dirty = true;
    }

    /// Keep the crosshair on the same sample after the view moved.
    pub(crate) fn refresh_inspection_after_view_change(&mut self) {
        if !self.inspection.active {
            return;
        }
        let data_x = self.inspection.data_x;
        self.snap_to_nearest(data_x);
    }

    fn snap_to_nearest(&mut self, target: f64) {
        let Some((x, y)) = self
            .topmost()
            .and_then(|s| nearest_index_for_x(s.x(), target).map(|i| (s.x()[i], s.y()[i])))
        else {
            return;
        };
        self.inspection.data_x = x;
        self.inspection.data_y = y;

        let gw = self.graph_width();
        let vmin = self.viewport.view_min_x();
        let range = self.viewport.view_max_x() - vmin;
        if gw > 0 && range > 0.0 {
            let col = ((x - vmin) / range * gw as f64).round();
            self.inspection.mouse_x = col.clamp(0.0, (gw - 1) as f64) as usize;
        }
        self.dirty = true;
    }
}
