//! Multi-series line chart.
//!
//! A [`Chart`] owns one titled grid slot: its named [`Series`] with a draw
//! order, a [`Viewport`] (domain, zoom window and axes), the crosshair
//! inspection state and the cell buffer it renders into.
//!
//! - Ingestion extends bounds in O(batch) and re-derives the viewport.
//! - Zoom keeps the sample under the cursor stationary, with tail-follow at
//!   the right edge.
//! - Drawing is braille-resolution with painter's-algorithm occlusion: the
//!   last series in draw order is the topmost.

mod inspect;
mod render;
mod zoom;

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};

use crate::format::{format_x_tick, Unit};
use crate::palette::{Palette, StyleHandle};
use crate::series::{MetricData, Series};
use crate::viewport::Viewport;

pub use inspect::Inspection;
pub use zoom::ZoomDirection;

/// Fraction of the view width added or removed per zoom step.
pub const DEFAULT_ZOOM_FACTOR: f64 = 0.10;
/// Narrowest X window a zoom can produce.
pub const MIN_ZOOM_RANGE: f64 = 5.0;
/// Cursor fraction beyond which zooming in follows the newest sample.
pub const TAIL_ANCHOR_MOUSE_THRESHOLD: f64 = 0.95;
/// X domain shown until a run passes this step.
pub const DEFAULT_MAX_X: f64 = 20.0;
pub const DEFAULT_MAX_Y: f64 = 1.0;
/// Buffer size of charts that are not on screen.
pub const PARKED_CANVAS_SIZE: usize = 1;

/// Styles shared by all charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyles {
    pub axis: Style,
    pub label: Style,
    pub inspection_line: Style,
    pub inspection_legend: Style,
}

impl Default for ChartStyles {
    fn default() -> Self {
        Self {
            axis: Style::default().fg(Color::Rgb(80, 80, 120)),
            label: Style::default().fg(Color::Rgb(100, 100, 140)),
            inspection_line: Style::default().fg(Color::Rgb(255, 200, 0)),
            inspection_legend: Style::default()
                .fg(Color::Rgb(230, 230, 230))
                .bg(Color::Rgb(30, 30, 50)),
        }
    }
}

/// A titled line chart overlaying one or more series.
#[derive(Debug)]
pub struct Chart {
    title: String,
    viewport: Viewport,
    buffer: Buffer,
    styles: ChartStyles,

    data: HashMap<String, Series>,
    /// Draw order; the last key is drawn on top.
    order: Vec<String>,
    palette: Palette,
    unit: Unit,

    focused: bool,
    dirty: bool,

    /// Set once the user zooms; ingestion then never resets the X view.
    is_zoomed: bool,
    /// Range the Y axis always covers.
    y_limits: Option<(f64, f64)>,

    // Observed data bounds across all series.
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,

    inspection: Inspection,
}

impl Chart {
    pub fn new(title: impl Into<String>) -> Self {
        let size = PARKED_CANVAS_SIZE;
        let mut chart = Self {
            title: title.into(),
            viewport: Viewport::new(size, size, (0.0, DEFAULT_MAX_X), (0.0, DEFAULT_MAX_Y)),
            buffer: Buffer::empty(Rect::new(0, 0, size as u16, size as u16)),
            styles: ChartStyles::default(),
            data: HashMap::new(),
            order: Vec::new(),
            palette: Palette::default(),
            unit: Unit::Scalar,
            focused: false,
            dirty: true,
            is_zoomed: false,
            y_limits: None,
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
            inspection: Inspection::default(),
        };
        chart.install_formatters();
        chart
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self.install_formatters();
        self
    }

    /// Keep `[min_y, max_y]` inside the Y axis whatever the data spans.
    pub fn with_y_limits(mut self, min_y: f64, max_y: f64) -> Self {
        if min_y.is_finite() && max_y.is_finite() && min_y < max_y {
            self.y_limits = Some((min_y, max_y));
            self.viewport.set_y_range(min_y, max_y);
            self.viewport.set_view_y_range(min_y, max_y);
        }
        self
    }

    fn install_formatters(&mut self) {
        let unit = self.unit;
        self.viewport.set_x_label_formatter(Box::new(format_x_tick));
        self.viewport
            .set_y_label_formatter(Box::new(move |v, _| unit.format(v)));
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The rendered cell buffer (valid after [`Chart::draw`]).
    pub fn view(&self) -> &Buffer {
        &self.buffer
    }

    pub fn width(&self) -> usize {
        self.viewport.width()
    }

    pub fn height(&self) -> usize {
        self.viewport.height()
    }

    pub fn graph_width(&self) -> usize {
        self.viewport.graph_width()
    }

    pub fn graph_height(&self) -> usize {
        self.viewport.graph_height()
    }

    /// First plot column relative to the chart's left edge.
    pub fn graph_start_x(&self) -> usize {
        self.viewport.graph_start_x()
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_zoomed(&self) -> bool {
        self.is_zoomed
    }

    /// Observed `(x_min, x_max, y_min, y_max)` across all series.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.x_max, self.y_min, self.y_max)
    }

    pub fn series_count(&self) -> usize {
        self.data.len()
    }

    pub fn has_series(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn series(&self, key: &str) -> Option<&Series> {
        self.data.get(key)
    }

    /// Series keys in draw order.
    pub fn series_keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn topmost(&self) -> Option<&Series> {
        self.order.last().and_then(|key| self.data.get(key))
    }

    /// Register an empty series drawing through `style`. Returns `false` if
    /// the key already exists.
    pub fn add_series(&mut self, key: &str, style: StyleHandle) -> bool {
        if self.data.contains_key(key) {
            return false;
        }
        self.data.insert(key.to_string(), Series::with_handle(style));
        self.order.push(key.to_string());
        true
    }

    /// Append a batch of `(x, y)` samples to series `key`, creating it with a
    /// palette color on first use.
    ///
    /// X values should arrive in non-decreasing order.
    pub fn add_data(&mut self, key: &str, data: &MetricData) {
        if !self.data.contains_key(key) {
            let style = Style::default().fg(self.palette.color_for(key));
            self.add_series(key, StyleHandle::new(style));
        }
        if data.is_empty() {
            return;
        }
        let Some(series) = self.data.get_mut(key) else {
            return;
        };
        series.append(&data.x, &data.y);

        let (x_lo, x_hi, y_lo, y_hi) = series.bounds();
        self.x_min = self.x_min.min(x_lo);
        self.x_max = self.x_max.max(x_hi);
        self.y_min = self.y_min.min(y_lo);
        self.y_max = self.y_max.max(y_hi);

        self.update_ranges();
        self.dirty = true;
    }

    /// Re-derive the Y axis and X domain from the observed bounds.
    fn update_ranges(&mut self) {
        if self.series_count() == 0 || !self.y_min.is_finite() || !self.y_max.is_finite() {
            return;
        }

        let padding = self.calculate_padding(self.y_max - self.y_min);
        let mut new_y_min = self.y_min - padding;
        let new_y_max = self.y_max + padding;
        // Non-negative data never gets a negative axis.
        if self.y_min >= 0.0 && new_y_min < 0.0 {
            new_y_min = 0.0;
        }
        let (new_y_min, new_y_max) = match self.y_limits {
            Some((lo, hi)) => (new_y_min.min(lo), new_y_max.max(hi)),
            None => (new_y_min, new_y_max),
        };

        let data_x_min = if self.x_min.is_finite() { self.x_min } else { 0.0 };
        let data_x_max = if self.x_max.is_finite() { self.x_max } else { 0.0 };
        let nice_max = nice_domain_max(data_x_min, data_x_max);

        self.viewport.set_y_range(new_y_min, new_y_max);
        self.viewport.set_view_y_range(new_y_min, new_y_max);

        // The domain always grows to cover new data; the view only follows it
        // while the user has not zoomed.
        self.viewport.set_x_range(data_x_min, nice_max);
        if !self.is_zoomed {
            self.viewport.set_view_x_range(data_x_min, nice_max);
        }

        if self.inspection.active {
            self.refresh_inspection_after_view_change();
        }
    }

    fn calculate_padding(&self, value_range: f64) -> f64 {
        if value_range == 0.0 {
            let abs = self.y_max.abs();
            if abs < 0.001 {
                return 0.0001;
            }
            return abs * 0.1;
        }
        (value_range * 0.1).max(1e-6)
    }

    /// Resize the chart's buffer.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.viewport.width() == width && self.viewport.height() == height {
            return;
        }
        self.viewport.resize(width, height);
        self.buffer
            .resize(Rect::new(0, 0, clamp_u16(width), clamp_u16(height)));
        self.update_ranges();
        self.dirty = true;
    }

    pub fn is_parked(&self) -> bool {
        self.viewport.width() == PARKED_CANVAS_SIZE && self.viewport.height() == PARKED_CANVAS_SIZE
    }

    /// Remove a series and recompute the chart bounds from the rest.
    pub fn remove_series(&mut self, key: &str) {
        if self.data.remove(key).is_none() {
            return;
        }
        self.order.retain(|k| k != key);

        self.recompute_bounds();
        if self.topmost().map_or(true, Series::is_empty) {
            self.inspection = Inspection::default();
        }
        self.update_ranges();
        self.dirty = true;
    }

    /// O(series) thanks to per-series bounds.
    fn recompute_bounds(&mut self) {
        self.x_min = f64::INFINITY;
        self.x_max = f64::NEG_INFINITY;
        self.y_min = f64::INFINITY;
        self.y_max = f64::NEG_INFINITY;

        for series in self.data.values().filter(|s| !s.is_empty()) {
            let (x_lo, x_hi, y_lo, y_hi) = series.bounds();
            self.x_min = self.x_min.min(x_lo);
            self.x_max = self.x_max.max(x_hi);
            self.y_min = self.y_min.min(y_lo);
            self.y_max = self.y_max.max(y_hi);
        }
    }

    /// Move `key` to the end of the draw order, keeping the others in place.
    pub fn promote_series_to_top(&mut self, key: &str) {
        let Some(idx) = self.order.iter().position(|k| k == key) else {
            return;
        };
        if idx == self.order.len() - 1 {
            return;
        }
        let key = self.order.remove(idx);
        self.order.push(key);
        if self.inspection.active {
            self.refresh_inspection_after_view_change();
        }
        self.dirty = true;
    }

    /// Swap the topmost series' style.
    pub fn set_graph_style(&self, style: Style) {
        if let Some(series) = self.topmost() {
            series.set_style(style);
        }
    }
}

/// Round the observed max X up to a multiple of 10, keeping a default
/// domain early in a run.
fn nice_domain_max(x_min: f64, x_max: f64) -> f64 {
    let nice = if x_max < DEFAULT_MAX_X {
        DEFAULT_MAX_X
    } else {
        ((x_max.ceil() / 10.0).ceil()) * 10.0
    };
    if nice <= x_min {
        return x_min + DEFAULT_MAX_X;
    }
    nice
}

fn clamp_u16(v: usize) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}
