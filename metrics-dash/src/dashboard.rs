//! Terminal host for the metrics grid.
//!
//! Owns the terminal (raw mode, alternate screen, mouse capture), routes key
//! and mouse events to the grid, and composites each chart's buffer into a
//! bordered cell. Ingestion runs on its own thread so rendering never waits
//! on the history file.

use std::io::{self, Stdout};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
    Frame, Terminal,
};

use crate::config::DashConfig;
use crate::error::{DashError, Result};
use crate::feed::FeedHandle;
use crate::format::truncate_title;
use crate::grid::{CellView, GridView, MetricsGrid};
use crate::layout::{GridDims, CHART_HEADER_HEIGHT};

/// Screen column where the grid starts.
const GRID_LEFT: u16 = 0;
/// Lines under the grid (status bar).
const STATUS_HEIGHT: u16 = 1;

/// RAII guard restoring the terminal even on panic.
struct TerminalCleanup;

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
    }
}

/// Dashboard colors.
pub mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(0, 200, 255);
    pub const NAV_INFO: Color = Color::Rgb(100, 100, 140);
    pub const BORDER: Color = Color::Rgb(80, 80, 120);
    pub const FOCUSED_BORDER: Color = Color::Rgb(255, 200, 0);
    pub const TITLE: Color = Color::Rgb(230, 230, 230);
    pub const STATUS_KEY: Color = Color::Rgb(255, 200, 0);
    pub const STATUS_TEXT: Color = Color::Rgb(100, 100, 140);
    pub const FILTER_PROMPT: Color = Color::Rgb(0, 255, 255);
}

/// Pointer position resolved to a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHit {
    /// Column relative to the grid's left edge.
    pub adjusted_x: usize,
    pub row: usize,
    pub col: usize,
}

/// Resolve a screen position to the grid cell under it.
pub fn cell_at(x: u16, y: u16, dims: GridDims) -> Option<CellHit> {
    let adjusted_x = usize::from(x.checked_sub(GRID_LEFT)?);
    let adjusted_y = usize::from(y).checked_sub(CHART_HEADER_HEIGHT)?;
    if dims.cell_w_with_padding == 0 || dims.cell_h_with_padding == 0 {
        return None;
    }
    Some(CellHit {
        adjusted_x,
        row: adjusted_y / dims.cell_h_with_padding,
        col: adjusted_x / dims.cell_w_with_padding,
    })
}

/// Run ingestion on its own thread until the feed closes.
pub fn spawn_ingest(grid: Arc<MetricsGrid>, feed: FeedHandle) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || {
            let mut batches = 0u64;
            while let Ok(batch) = feed.batches.recv() {
                grid.process_history(&batch);
                batches += 1;
            }
            tracing::debug!(batches, charts = grid.chart_count(), "ingest finished");
        })
        .map_err(DashError::Io)
}

/// The interactive dashboard.
pub struct Dashboard {
    grid: Arc<MetricsGrid>,
    refresh: Duration,
    should_quit: bool,
    /// Last grid content size handed to the grid.
    content: (u16, u16),
    title: String,
}

impl Dashboard {
    pub fn new(grid: Arc<MetricsGrid>, config: &DashConfig) -> Self {
        Self {
            grid,
            refresh: Duration::from_millis(config.refresh_ms),
            should_quit: false,
            content: (0, 0),
            title: "Metrics".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn grid(&self) -> &Arc<MetricsGrid> {
        &self.grid
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Take over the terminal until the user quits. The feed (if any) is
    /// ingested on a background thread and stopped on exit.
    pub fn run(&mut self, feed: Option<FeedHandle>) -> Result<()> {
        let stop = feed.as_ref().map(FeedHandle::stop_signal);
        let ingest = feed.map(|f| spawn_ingest(Arc::clone(&self.grid), f)).transpose()?;

        let result = self.run_terminal();

        if let Some(stop) = stop {
            stop.store(true, Ordering::Relaxed);
        }
        if let Some(ingest) = ingest {
            if ingest.join().is_err() {
                tracing::error!("ingest thread panicked");
            }
        }
        result
    }

    fn run_terminal(&mut self) -> Result<()> {
        enable_raw_mode().map_err(|e| DashError::terminal(format!("enable raw mode: {e}")))?;
        let _cleanup = TerminalCleanup;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        self.main_loop(&mut terminal)
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(self.refresh)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Keep the grid laid out for the current frame size.
    fn sync_dimensions(&mut self, area: Rect) {
        let content = (area.width, area.height.saturating_sub(STATUS_HEIGHT));
        if content != self.content {
            self.content = content;
            self.grid
                .update_dimensions(usize::from(content.0), usize::from(content.1));
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        self.sync_dimensions(area);

        let grid_area = Rect {
            height: area.height.saturating_sub(STATUS_HEIGHT),
            ..area
        };
        let status_area = Rect {
            y: area.y + grid_area.height,
            height: area.height.min(STATUS_HEIGHT),
            ..area
        };

        let view = self.grid.view();
        let buf = f.buffer_mut();
        render_header(&self.title, &view, grid_area, buf);
        render_grid(&view, grid_area, buf);
        self.render_status(status_area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let key = Style::default().fg(colors::STATUS_KEY);
        let text = Style::default().fg(colors::STATUS_TEXT);

        let line = if self.grid.is_filter_mode() {
            let mode = self.grid.filter_match_mode().label();
            Line::from(vec![
                Span::styled(format!("Filter ({mode}): "), Style::default().fg(colors::FILTER_PROMPT)),
                Span::raw(format!("{}_", self.grid.filter_query())),
                Span::styled(format!("  [{} matches]", self.grid.preview_match_count()), text),
                Span::styled("  Enter", key),
                Span::styled(" apply ", text),
                Span::styled("Esc", key),
                Span::styled(" cancel ", text),
                Span::styled("Tab", key),
                Span::styled(" mode", text),
            ])
        } else {
            let mut spans = Vec::new();
            let applied = self.grid.filter_query();
            if !applied.is_empty() {
                spans.push(Span::styled(format!("filter: {applied}  "), text));
            }
            spans.extend([
                Span::styled("/", key),
                Span::styled(" filter  ", text),
                Span::styled("PgUp/PgDn", key),
                Span::styled(" page  ", text),
                Span::styled("wheel", key),
                Span::styled(" zoom  ", text),
                Span::styled("right-drag", key),
                Span::styled(" inspect (Alt: all)  ", text),
                Span::styled("q", key),
                Span::styled(" quit", text),
            ]);
            Line::from(spans)
        };
        Paragraph::new(line).render(area, buf);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.grid.is_filter_mode() {
            self.handle_filter_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.grid.clear_filter();
            }
            KeyCode::Char('/') => self.grid.enter_filter_mode(),
            KeyCode::PageDown | KeyCode::Char('n') => {
                self.grid.navigate(1);
            }
            KeyCode::PageUp | KeyCode::Char('N') => {
                self.grid.navigate(-1);
            }
            KeyCode::Esc => self.grid.clear_focus(),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.grid.commit_filter(),
            KeyCode::Esc => self.grid.cancel_filter(),
            KeyCode::Tab => self.grid.toggle_filter_mode(),
            KeyCode::Backspace => {
                let mut draft = self.grid.filter_query();
                draft.pop();
                self.grid.set_filter_draft(&draft);
            }
            KeyCode::Char(c) => {
                let mut draft = self.grid.filter_query();
                draft.push(c);
                self.grid.set_filter_draft(&draft);
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let dims = self.grid.dims();
        let hit = cell_at(mouse.column, mouse.row, dims);
        let synced = mouse.modifiers.contains(KeyModifiers::ALT);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(hit) = hit {
                    self.grid.handle_click(hit.row, hit.col);
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                if let Some(hit) = hit {
                    self.grid
                        .start_inspection(hit.adjusted_x, hit.row, hit.col, synced);
                }
            }
            MouseEventKind::Drag(MouseButton::Right) => {
                let x = usize::from(mouse.column.saturating_sub(GRID_LEFT));
                self.grid.update_inspection(x);
            }
            MouseEventKind::Up(MouseButton::Right) => self.grid.end_inspection(),
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                if let Some(hit) = hit {
                    let wheel_up = mouse.kind == MouseEventKind::ScrollUp;
                    self.grid.handle_wheel(hit.adjusted_x, hit.row, hit.col, wheel_up);
                }
            }
            _ => {}
        }
    }
}

/// Section header with page position.
pub fn render_header(title: &str, view: &GridView, area: Rect, buf: &mut Buffer) {
    if area.height == 0 {
        return;
    }
    let header = Rect {
        height: CHART_HEADER_HEIGHT.min(usize::from(area.height)) as u16,
        ..area
    };
    let line = Line::from(vec![
        Span::styled(
            title.to_string(),
            Style::default()
                .fg(colors::HEADER)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(view.nav_info(), Style::default().fg(colors::NAV_INFO)),
    ]);
    Paragraph::new(line).render(header, buf);
}

/// Draw every chart of the page into its cell.
pub fn render_grid(view: &GridView, area: Rect, buf: &mut Buffer) {
    for cell in &view.cells {
        let Some(rect) = cell_rect(view.dims, cell.row, cell.col, area) else {
            continue;
        };
        render_cell(cell, view.dims, rect, buf);
    }
}

fn cell_rect(dims: GridDims, row: usize, col: usize, area: Rect) -> Option<Rect> {
    let x = area.x as usize + usize::from(GRID_LEFT) + col * dims.cell_w_with_padding;
    let y = area.y as usize + CHART_HEADER_HEIGHT + row * dims.cell_h_with_padding;
    let rect = Rect::new(
        u16::try_from(x).ok()?,
        u16::try_from(y).ok()?,
        u16::try_from(dims.cell_w_with_padding).ok()?,
        u16::try_from(dims.cell_h_with_padding).ok()?,
    )
    .intersection(area);
    (!rect.is_empty()).then_some(rect)
}

/// Border, title line and chart body of one cell.
fn render_cell(cell: &CellView, dims: GridDims, rect: Rect, buf: &mut Buffer) {
    let border = if cell.focused {
        colors::FOCUSED_BORDER
    } else {
        colors::BORDER
    };
    let block = Block::bordered().border_style(Style::default().fg(border));
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.is_empty() {
        return;
    }

    let title_width = dims.cell_w_with_padding.saturating_sub(4).max(10);
    let title = truncate_title(cell.chart.title(), title_width);
    buf.set_stringn(
        inner.x,
        inner.y,
        &title,
        usize::from(inner.width),
        Style::default().fg(colors::TITLE),
    );

    let body = Rect {
        y: inner.y + 1,
        height: inner.height.saturating_sub(1),
        ..inner
    };
    // A panicking chart must not take the dashboard down.
    let drawn = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut chart = cell.chart.lock();
        chart.draw_if_needed();
        blit(chart.view(), body, buf);
    }));
    if drawn.is_err() {
        tracing::error!(title = cell.chart.title(), "chart render panicked, skipping cell");
    }
}

/// Copy `src` into `buf` at `target`, clipped.
fn blit(src: &Buffer, target: Rect, buf: &mut Buffer) {
    let width = src.area.width.min(target.width);
    let height = src.area.height.min(target.height);
    for y in 0..height {
        for x in 0..width {
            let Some(cell) = src.cell((x, y)) else {
                continue;
            };
            if let Some(dst) = buf.cell_mut((target.x + x, target.y + y)) {
                *dst = cell.clone();
            }
        }
    }
}
