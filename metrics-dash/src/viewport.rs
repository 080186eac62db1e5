//! Chart viewport: data domain, visible window, axes and graph geometry.
//!
//! Layout of a chart buffer of `width × height` cells:
//!
//! ```text
//!  1.5 │⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀   rows 0..origin.y       graph area
//!      │⠀⠀⠀⠀⠀⠀⢀⠤⠒⠉⠀⠀⠀⠀
//!  0.5 │⠤⠒⠉⠁⠀⠀⠀⠀⠀⠀⠀⠀⠀⠀
//!      └──────────────   row origin.y           x axis
//!      0      10     20   row origin.y + 1       x labels
//! ```

use std::fmt;

use ratatui::buffer::Buffer;
use ratatui::style::Style;

use crate::format::{display_width, format_x_tick, Unit};

/// Vertical axis glyph.
pub const AXIS_VERTICAL: char = '│';
/// Horizontal axis glyph.
pub const AXIS_HORIZONTAL: char = '─';
/// Axis corner glyph.
pub const AXIS_CORNER: char = '└';

/// Formats an axis value given the maximum label width in columns.
pub type LabelFormatter = Box<dyn Fn(f64, usize) -> String + Send + Sync>;

/// Cell coordinate inside a chart buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellPoint {
    pub x: usize,
    pub y: usize,
}

/// Domain, view window and axis geometry of one chart.
pub struct Viewport {
    width: usize,
    height: usize,

    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,

    view_min_x: f64,
    view_max_x: f64,
    view_min_y: f64,
    view_max_y: f64,

    x_steps: usize,
    y_steps: usize,

    x_label: LabelFormatter,
    y_label: LabelFormatter,
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("size", &(self.width, self.height))
            .field("domain_x", &(self.min_x, self.max_x))
            .field("domain_y", &(self.min_y, self.max_y))
            .field("view_x", &(self.view_min_x, self.view_max_x))
            .field("view_y", &(self.view_min_y, self.view_max_y))
            .finish()
    }
}

impl Viewport {
    pub fn new(width: usize, height: usize, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            width,
            height,
            min_x: x_range.0,
            max_x: x_range.1,
            min_y: y_range.0,
            max_y: y_range.1,
            view_min_x: x_range.0,
            view_max_x: x_range.1,
            view_min_y: y_range.0,
            view_max_y: y_range.1,
            x_steps: 4,
            y_steps: 5,
            x_label: Box::new(format_x_tick),
            y_label: Box::new(|v, _| Unit::Scalar.format(v)),
        }
    }

    pub fn set_x_label_formatter(&mut self, f: LabelFormatter) {
        self.x_label = f;
    }

    pub fn set_y_label_formatter(&mut self, f: LabelFormatter) {
        self.y_label = f;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    // ---- Ranges ----

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn view_min_x(&self) -> f64 {
        self.view_min_x
    }

    pub fn view_max_x(&self) -> f64 {
        self.view_max_x
    }

    pub fn view_min_y(&self) -> f64 {
        self.view_min_y
    }

    pub fn view_max_y(&self) -> f64 {
        self.view_max_y
    }

    pub fn domain_width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn view_width(&self) -> f64 {
        self.view_max_x - self.view_min_x
    }

    /// Set the X domain; the view window is clamped into it.
    pub fn set_x_range(&mut self, min: f64, max: f64) {
        let (min, max) = ordered(min, max);
        self.min_x = min;
        self.max_x = max;
        self.set_view_x_range(self.view_min_x, self.view_max_x);
    }

    /// Set the Y domain; the view window is clamped into it.
    pub fn set_y_range(&mut self, min: f64, max: f64) {
        let (min, max) = ordered(min, max);
        self.min_y = min;
        self.max_y = max;
        self.set_view_y_range(self.view_min_y, self.view_max_y);
    }

    pub fn set_view_x_range(&mut self, min: f64, max: f64) {
        (self.view_min_x, self.view_max_x) = clamp_window(min, max, self.min_x, self.max_x);
    }

    pub fn set_view_y_range(&mut self, min: f64, max: f64) {
        (self.view_min_y, self.view_max_y) = clamp_window(min, max, self.min_y, self.max_y);
    }

    // ---- Geometry ----

    pub fn x_steps(&self) -> usize {
        self.x_steps
    }

    pub fn y_steps(&self) -> usize {
        self.y_steps
    }

    /// Y tick values from bottom to top.
    fn y_ticks(&self) -> Vec<f64> {
        if self.y_steps == 0 {
            return Vec::new();
        }
        let step = (self.view_max_y - self.view_min_y) / self.y_steps as f64;
        (0..=self.y_steps)
            .map(|i| self.view_min_y + step * i as f64)
            .collect()
    }

    /// Width of the Y label gutter, capped at half the chart width.
    fn y_label_width(&self) -> usize {
        let widest = self
            .y_ticks()
            .into_iter()
            .map(|v| display_width(&(self.y_label)(v, 0)))
            .max()
            .unwrap_or(0);
        widest.min(self.width / 2)
    }

    /// Cell where the two axes meet.
    pub fn origin(&self) -> CellPoint {
        CellPoint {
            x: self.y_label_width(),
            y: self.height.saturating_sub(2),
        }
    }

    /// First column of the plot area.
    pub fn graph_start_x(&self) -> usize {
        self.origin().x + 1
    }

    pub fn graph_width(&self) -> usize {
        self.width.saturating_sub(self.graph_start_x())
    }

    pub fn graph_height(&self) -> usize {
        self.origin().y
    }

    /// About one horizontal cell in X data units for `x_range`.
    pub fn pixel_eps_x(&self, x_range: f64) -> f64 {
        let w = self.graph_width();
        if w == 0 || x_range <= 0.0 {
            return 0.0;
        }
        x_range / w as f64
    }

    /// Room per X tick label, leaving one column of slack.
    pub fn max_x_label_width(&self) -> usize {
        let w = self.graph_width();
        if w == 0 {
            return 0;
        }
        let mut per = w / self.x_steps;
        if per > 1 {
            per -= 1;
        }
        per.max(1)
    }

    /// Draw axis lines and tick labels.
    pub fn draw_axes(&self, buf: &mut Buffer, axis_style: Style, label_style: Style) {
        let origin = self.origin();
        let (gw, gh) = (self.graph_width(), self.graph_height());
        if self.width == 0 || self.height < 2 {
            return;
        }

        // Axis lines.
        for y in 0..origin.y {
            put(buf, origin.x, y, AXIS_VERTICAL, axis_style);
        }
        put(buf, origin.x, origin.y, AXIS_CORNER, axis_style);
        for x in origin.x + 1..self.width {
            put(buf, x, origin.y, AXIS_HORIZONTAL, axis_style);
        }

        // Y labels, bottom to top, right-aligned in the gutter.
        if gh > 0 && origin.x > 0 {
            let mut last_row = None;
            for (i, v) in self.y_ticks().into_iter().enumerate() {
                let offset = i * gh.saturating_sub(1) / self.y_steps.max(1);
                let row = gh - 1 - offset.min(gh - 1);
                if last_row == Some(row) {
                    continue;
                }
                last_row = Some(row);
                let label = (self.y_label)(v, origin.x);
                let w = display_width(&label).min(origin.x);
                put_str(buf, origin.x - w, row, &label, w, label_style);
            }
        }

        // X labels on the row under the axis, skipping collisions.
        let label_row = origin.y + 1;
        if gw == 0 || label_row >= self.height {
            return;
        }
        let max_w = self.max_x_label_width();
        let step = self.view_width() / self.x_steps as f64;
        let mut next_free = 0;
        for i in 0..=self.x_steps {
            let v = self.view_min_x + step * i as f64;
            let col = self.graph_start_x() + i * (gw - 1) / self.x_steps;
            let label = (self.x_label)(v, max_w);
            let w = display_width(&label);
            let start = col.saturating_sub(w / 2).min(self.width.saturating_sub(w));
            if start < next_free {
                continue;
            }
            put_str(buf, start, label_row, &label, self.width - start, label_style);
            next_free = start + w + 1;
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Clamp `[min, max]` into `[lo, hi]`, falling back to the whole domain when
/// the window is inverted or non-finite.
fn clamp_window(min: f64, max: f64, lo: f64, hi: f64) -> (f64, f64) {
    let min = if min.is_finite() { min.max(lo) } else { lo };
    let max = if max.is_finite() { max.min(hi) } else { hi };
    if min > max {
        return (lo, hi);
    }
    (min, max)
}

pub(crate) fn put(buf: &mut Buffer, x: usize, y: usize, ch: char, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch).set_style(style);
    }
}

pub(crate) fn put_str(buf: &mut Buffer, x: usize, y: usize, s: &str, max_width: usize, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    buf.set_stringn(x, y, s, max_width, style);
}
