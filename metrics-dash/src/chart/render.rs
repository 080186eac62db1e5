//! Chart rasterization and the inspection overlay.

use ratatui::style::Style;

use super::Chart;
use crate::braille::{draw_line, BrailleGrid, PixelPoint, BRAILLE_BLANK};
use crate::format::{display_width, format_sig_figs, format_x_tick};
use crate::series::{nearest_index_for_x, Series};
use crate::viewport::{put, put_str, AXIS_VERTICAL};

/// Swatch drawn before each legend entry.
const LEGEND_SWATCH: &str = "▬▬";

impl Chart {
    /// Redraw only when something changed since the last draw.
    pub fn draw_if_needed(&mut self) {
        if self.dirty {
            self.draw();
        }
    }

    /// Render axes, every series and the inspection overlay into the buffer.
    pub fn draw(&mut self) {
        self.buffer.reset();
        self.dirty = false;
        self.viewport
            .draw_axes(&mut self.buffer, self.styles.axis, self.styles.label);

        let (gw, gh) = (self.graph_width(), self.graph_height());
        if gw == 0 || gh == 0 {
            return;
        }

        let layers: Vec<(BrailleGrid, Style)> = self
            .order
            .iter()
            .filter_map(|key| self.data.get(key))
            .filter(|series| !series.is_empty())
            .map(|series| (self.rasterize(series, gw, gh), series.style()))
            .collect();
        for (grid, style) in &layers {
            self.paint(grid, *style);
        }

        if self.inspection.active {
            self.draw_inspection_overlay();
        }
    }

    /// Project the visible samples of one series onto a braille grid the
    /// size of the plot area.
    fn rasterize(&self, series: &Series, gw: usize, gh: usize) -> BrailleGrid {
        let vp = &self.viewport;
        let (vmin, vmax) = (vp.view_min_x(), vp.view_max_x());
        let (ymin, ymax) = (vp.view_min_y(), vp.view_max_y());

        let mut grid = BrailleGrid::new(gw, gh);
        if vmax <= vmin || ymax <= ymin {
            return grid;
        }

        let range = series.visible_range(vmin, vmax, vp.pixel_eps_x(vmax - vmin));
        let x_scale = gw as f64 / (vmax - vmin);
        let y_scale = gh as f64 / (ymax - ymin);
        let x_limit = (gw + 1) as f64;

        let points: Vec<PixelPoint> = series.x()[range.clone()]
            .iter()
            .zip(&series.y()[range])
            .filter(|(_, y)| y.is_finite())
            .map(|(&x, &y)| ((x - vmin) * x_scale, (y - ymin) * y_scale))
            .filter(|&(cx, _)| (0.0..=x_limit).contains(&cx))
            .map(|(cx, cy)| grid.grid_point(cx, cy))
            .collect();

        match points.as_slice() {
            [] => {}
            [only] => grid.set(*only),
            _ => {
                for pair in points.windows(2) {
                    draw_line(&mut grid, pair[0], pair[1]);
                }
            }
        }
        grid
    }

    /// Copy lit cells into the buffer. Whole cells are replaced, so a later
    /// series hides an earlier one where both are drawn.
    fn paint(&mut self, grid: &BrailleGrid, style: Style) {
        let start_x = self.graph_start_x();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let ch = grid.pattern_at(col, row);
                if ch == BRAILLE_BLANK {
                    continue;
                }
                put(&mut self.buffer, start_x + col, row, ch, style);
            }
        }
    }

    /// Legend rows `(swatch style, text)`, topmost series first.
    fn legend_entries(&self) -> Vec<(Style, String)> {
        let anchor = self.inspection.data_x;
        self.order
            .iter()
            .rev()
            .filter_map(|key| self.data.get(key))
            .filter_map(|series| {
                let idx = nearest_index_for_x(series.x(), anchor)?;
                let label = format!(
                    "{}: {}",
                    format_x_tick(series.x()[idx], 0),
                    format_sig_figs(series.y()[idx], 4)
                );
                Some((series.style(), label))
            })
            .collect()
    }

    fn draw_inspection_overlay(&mut self) {
        let (gw, gh) = (self.graph_width(), self.graph_height());
        let start_x = self.graph_start_x();
        let canvas_x = start_x + self.inspection.mouse_x.min(gw.saturating_sub(1));

        for row in 0..gh {
            put(&mut self.buffer, canvas_x, row, AXIS_VERTICAL, self.styles.inspection_line);
        }

        let mut entries = self.legend_entries();
        entries.truncate(gh);
        if entries.is_empty() {
            return;
        }

        let swatch_width = display_width(LEGEND_SWATCH);
        let total_width = entries
            .iter()
            .map(|(_, label)| swatch_width + 1 + display_width(label))
            .max()
            .unwrap_or(0);

        let right_bound = self.width();
        let mut legend_x = canvas_x + 1;
        if legend_x + total_width >= right_bound {
            legend_x = canvas_x.saturating_sub(1 + total_width).max(start_x);
        }

        let n = entries.len();
        let mut start_y = (gh / 2).saturating_sub(n / 2);
        if start_y + n > gh {
            start_y = gh - n;
        }

        let legend = self.styles.inspection_legend;
        let room = right_bound.saturating_sub(legend_x);
        for (i, (swatch, label)) in entries.iter().enumerate() {
            let y = start_y + i;
            let swatch_style = legend.patch(Style::default().fg(swatch.fg.unwrap_or_default()));
            put_str(&mut self.buffer, legend_x, y, LEGEND_SWATCH, room, swatch_style);
            let text_x = legend_x + swatch_width;
            let text = format!(" {label:<width$}", width = total_width - swatch_width - 1);
            put_str(
                &mut self.buffer,
                text_x,
                y,
                &text,
                room.saturating_sub(swatch_width),
                legend,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::style::{Color, Style};

    use crate::chart::Chart;
    use crate::palette::StyleHandle;
    use crate::series::MetricData;

    fn symbol(chart: &Chart, x: usize, y: usize) -> String {
        chart
            .view()
            .cell((x as u16, y as u16))
            .map(|c| c.symbol().to_string())
            .unwrap_or_default()
    }

    fn fg(chart: &Chart, x: usize, y: usize) -> Option<Color> {
        chart.view().cell((x as u16, y as u16)).map(|c| c.fg)
    }

    fn is_braille(s: &str) -> bool {
        s.chars()
            .next()
            .is_some_and(|c| ('\u{2801}'..='\u{28FF}').contains(&c))
    }

    fn lit_cells(chart: &Chart) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..chart.graph_height() {
            for x in chart.graph_start_x()..chart.width() {
                if is_braille(&symbol(chart, x, y)) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_draw_clears_dirty() {
        let mut chart = Chart::new("loss");
        chart.resize(40, 10);
        chart.add_data("main", &MetricData::new(vec![0.0, 10.0], vec![0.0, 1.0]));
        assert!(chart.is_dirty());
        chart.draw_if_needed();
        assert!(!chart.is_dirty());
    }

    #[test]
    fn test_line_is_drawn() {
        let mut chart = Chart::new("loss");
        chart.resize(40, 10);
        chart.add_data("main", &MetricData::new(vec![0.0, 20.0], vec![0.0, 1.0]));
        chart.draw();

        let cells = lit_cells(&chart);
        // A diagonal across the whole plot touches every column.
        assert!(cells.len() >= chart.graph_width());
    }

    #[test]
    fn test_single_point_is_drawn() {
        let mut chart = Chart::new("loss");
        chart.resize(40, 10);
        chart.add_data("main", &MetricData::point(5.0, 1.0));
        chart.draw();
        assert_eq!(lit_cells(&chart).len(), 1);
    }

    #[test]
    fn test_topmost_series_occludes() {
        let mut chart = Chart::new("loss");
        chart.resize(40, 10);
        chart.add_series("under", StyleHandle::new(Style::default().fg(Color::Red)));
        chart.add_series("over", StyleHandle::new(Style::default().fg(Color::Blue)));
        let flat = MetricData::new(vec![0.0, 20.0], vec![0.5, 0.5]);
        chart.add_data("under", &flat);
        chart.add_data("over", &flat);
        chart.draw();

        let cells = lit_cells(&chart);
        assert!(!cells.is_empty());
        assert!(cells.iter().all(|&(x, y)| fg(&chart, x, y) == Some(Color::Blue)));

        chart.promote_series_to_top("under");
        chart.draw();
        assert!(cells.iter().all(|&(x, y)| fg(&chart, x, y) == Some(Color::Red)));
    }

    #[test]
    fn test_zoomed_out_samples_culled() {
        let mut chart = Chart::new("loss");
        chart.resize(40, 10);
        let xs: Vec<f64> = (0..=100).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| if *x < 50.0 { 0.0 } else { 1.0 }).collect();
        chart.add_data("main", &MetricData::new(xs, ys));
        for _ in 0..30 {
            chart.handle_zoom(crate::chart::ZoomDirection::In, 0);
        }
        chart.draw();

        // Only the flat low half is visible: every lit cell sits on the bottom row.
        let bottom = chart.graph_height() - 1;
        assert!(lit_cells(&chart).iter().all(|&(_, y)| y == bottom));
    }

    #[test]
    fn test_inspection_overlay() {
        let mut chart = Chart::new("loss");
        chart.resize(60, 12);
        chart.add_data("main", &MetricData::new(vec![0.0, 5.0, 10.0], vec![1.0, 2.0, 3.0]));
        chart.inspect_at_data_x(5.0);
        chart.draw();

        let col = chart.graph_start_x() + chart.inspection().mouse_x;
        assert_eq!(symbol(&chart, col, 0), "│");

        let rows: Vec<String> = (0..chart.graph_height())
            .map(|y| (0..chart.width()).map(|x| symbol(&chart, x, y)).collect())
            .collect();
        assert!(rows.iter().any(|r| r.contains("▬▬ 5: 2")));
    }

    #[test]
    fn test_legend_flips_left_at_right_edge() {
        let mut chart = Chart::new("loss");
        chart.resize(60, 12);
        chart.add_data("main", &MetricData::new(vec![0.0, 20.0], vec![1.0, 2.0]));
        chart.inspect_at_data_x(20.0);
        chart.draw();

        let col = chart.graph_start_x() + chart.inspection().mouse_x;
        let row = (0..chart.graph_height())
            .find(|&y| (0..chart.width()).any(|x| symbol(&chart, x, y) == "▬"))
            .expect("legend row");
        let swatch = (0..chart.width())
            .find(|&x| symbol(&chart, x, row) == "▬")
            .expect("swatch");
        assert!(swatch < col);
    }

    #[test]
    fn test_parked_chart_draws_nothing() {
        let mut chart = Chart::new("loss");
        chart.add_data("main", &MetricData::point(1.0, 1.0));
        chart.draw();
        assert!(lit_cells(&chart).is_empty());
    }
}
