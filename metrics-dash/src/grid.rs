//! Paginated, filterable grid of metric charts.
//!
//! All chart bookkeeping (sorted chart list, filter result, current page,
//! focus) lives in one [`GridState`] behind a reader-writer lock. Every
//! chart is also behind its own mutex so that a render pass can draw after
//! releasing the grid lock:
//!
//! 1. [`MetricsGrid::view`] takes the read lock just long enough to clone the
//!    handles on the current page.
//! 2. The caller then locks and draws each chart on its own.
//!
//! The grid lock and a chart lock are never held together. Layout decisions
//! (cell size, parking, focus) are published through the chart's
//! [`ChartHandle`] without its lock and applied the next time the chart is
//! locked. Accent colors travel the same way through a [`StyleHandle`].
//! A chart being drawn therefore never stalls ingestion into another chart.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ratatui::style::Style;

use crate::chart::{Chart, ZoomDirection, PARKED_CANVAS_SIZE};
use crate::config::DashConfig;
use crate::filter::{FilterState, MatchMode};
use crate::focus::{Focus, FocusChange};
use crate::layout::{
    compute_grid_dims, effective_grid_size, items_per_page, GridDims, GridNavigator, GridSize,
    GridSpec,
};
use crate::metric_defs::{place_metric, Placement};
use crate::palette::{Palette, PaletteCache, StyleHandle};
use crate::series::{HistoryBatch, MetricData};

/// Series key used by single-run ingestion.
pub const DEFAULT_SERIES_KEY: &str = "default";

/// Joins a run key and a device name into one series key: `run-1/GPU 0`.
pub const RUN_SERIES_SEPARATOR: char = '/';

/// Size and focus the grid wants a chart to have.
#[derive(Debug)]
struct CellTarget {
    /// Width in the high half, height in the low half.
    size: AtomicU64,
    focused: AtomicBool,
}

impl CellTarget {
    fn new(width: usize, height: usize) -> Self {
        Self {
            size: AtomicU64::new(pack_size(width, height)),
            focused: AtomicBool::new(false),
        }
    }

    fn set_size(&self, width: usize, height: usize) {
        self.size.store(pack_size(width, height), Ordering::Release);
    }

    fn park(&self) {
        self.set_size(PARKED_CANVAS_SIZE, PARKED_CANVAS_SIZE);
    }

    fn size(&self) -> (usize, usize) {
        let packed = self.size.load(Ordering::Acquire);
        ((packed >> 32) as usize, (packed & u64::from(u32::MAX)) as usize)
    }

    fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Release);
    }

    fn focused(&self) -> bool {
        self.focused.load(Ordering::Acquire)
    }
}

fn pack_size(width: usize, height: usize) -> u64 {
    let w = u32::try_from(width).unwrap_or(u32::MAX);
    let h = u32::try_from(height).unwrap_or(u32::MAX);
    (u64::from(w) << 32) | u64::from(h)
}

/// Shared reference to one chart.
#[derive(Debug, Clone)]
pub struct ChartHandle {
    title: Arc<str>,
    chart: Arc<Mutex<Chart>>,
    /// Color of the single-run series; reassigned by position after sorting.
    accent: StyleHandle,
    target: Arc<CellTarget>,
}

impl ChartHandle {
    fn new(chart: Chart, accent: StyleHandle) -> Self {
        Self {
            title: Arc::from(chart.title()),
            target: Arc::new(CellTarget::new(chart.width(), chart.height())),
            chart: Arc::new(Mutex::new(chart)),
            accent,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn accent(&self) -> &StyleHandle {
        &self.accent
    }

    /// Lock the chart, bringing its size and focus flag up to date with the
    /// grid's latest layout. A panic while drawing poisons the mutex; the
    /// chart state itself stays usable, so the poison is ignored.
    pub fn lock(&self) -> MutexGuard<'_, Chart> {
        let mut chart = self.chart.lock().unwrap_or_else(PoisonError::into_inner);
        let (width, height) = self.target.size();
        chart.resize(width, height);
        chart.set_focused(self.target.focused());
        chart
    }

    pub fn ptr_eq(&self, other: &ChartHandle) -> bool {
        Arc::ptr_eq(&self.chart, &other.chart)
    }
}

/// One occupied cell of a [`GridView`].
#[derive(Debug, Clone)]
pub struct CellView {
    pub row: usize,
    pub col: usize,
    pub chart: ChartHandle,
    pub focused: bool,
}

/// Snapshot of the current page, taken under the read lock.
#[derive(Debug, Clone)]
pub struct GridView {
    pub size: GridSize,
    pub dims: GridDims,
    pub cells: Vec<CellView>,
    /// Zero-based `[start, end)` of the page within the shown charts.
    pub page_start: usize,
    pub page_end: usize,
    /// Charts passing the applied filter.
    pub shown: usize,
    /// All charts.
    pub total: usize,
    pub total_pages: usize,
    pub filter_applied: bool,
}

impl GridView {
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellView> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    /// Page position for the section header, e.g. ` [1-12 of 40]`.
    pub fn nav_info(&self) -> String {
        if self.total_pages == 0 || self.shown == 0 {
            return String::new();
        }
        if self.filter_applied {
            format!(
                " [{}-{} of {} filtered from {} total]",
                self.page_start + 1,
                self.page_end,
                self.shown,
                self.total
            )
        } else {
            format!(" [{}-{} of {}]", self.page_start + 1, self.page_end, self.shown)
        }
    }

    /// Draw every dirty chart on the page.
    pub fn draw_charts(&self) {
        for cell in &self.cells {
            cell.chart.lock().draw_if_needed();
        }
    }
}

/// Chart of an in-progress inspection drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InspectionAnchor {
    row: usize,
    col: usize,
    synced: bool,
}

/// Samples for one series, appended after the grid lock is released.
struct AppendJob<'a> {
    handle: ChartHandle,
    key: String,
    style: StyleHandle,
    data: &'a MetricData,
}

#[derive(Debug)]
struct GridState {
    width: usize,
    height: usize,
    rows: usize,
    cols: usize,

    /// Sorted by title.
    all: Vec<ChartHandle>,
    by_title: HashMap<String, ChartHandle>,
    /// Subsequence of `all` passing the applied filter.
    filtered: Vec<ChartHandle>,
    /// `rows × cols` of the effective grid.
    current_page: Vec<Vec<Option<ChartHandle>>>,
    nav: GridNavigator,

    focus: Focus,
    filter: FilterState,
    inspecting: Option<InspectionAnchor>,

    palette: Palette,
    palette_cache: PaletteCache,
}

impl GridState {
    fn spec(&self) -> GridSpec {
        GridSpec::new(self.rows, self.cols)
    }

    fn size(&self) -> GridSize {
        effective_grid_size(self.width, self.height, self.spec())
    }

    fn dims(&self) -> GridDims {
        compute_grid_dims(self.width, self.height, self.spec())
    }

    fn per_page(&self) -> usize {
        items_per_page(self.size())
    }

    fn cell(&self, row: usize, col: usize) -> Option<&ChartHandle> {
        self.current_page.get(row)?.get(col)?.as_ref()
    }

    fn page_handles(&self) -> impl Iterator<Item = (usize, usize, &ChartHandle)> {
        self.current_page.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.as_ref().map(|h| (r, c, h)))
        })
    }

    fn page_snapshot(&self) -> Vec<ChartHandle> {
        self.page_handles().map(|(_, _, h)| h.clone()).collect()
    }

    fn find_on_page(&self, title: &str) -> Option<(usize, usize)> {
        self.page_handles()
            .find(|(_, _, h)| h.title() == title)
            .map(|(r, c, _)| (r, c))
    }

    fn create_chart(&mut self, title: &str, placement: Option<&Placement>) -> ChartHandle {
        let dims = self.dims();
        let mut chart = Chart::new(title).with_palette(self.palette.clone());
        if let Some(def) = placement.map(|p| p.def) {
            chart = chart.with_unit(def.unit);
            if def.is_percentage() {
                chart = chart.with_y_limits(def.min_y, def.max_y);
            }
        }
        chart.resize(dims.cell_w, dims.cell_h);

        let handle = ChartHandle::new(chart, StyleHandle::new(Style::default()));
        self.all.push(handle.clone());
        self.by_title.insert(title.to_string(), handle.clone());
        if self.all.len() % 1000 == 0 {
            tracing::debug!(charts = self.all.len(), "metrics grid chart count");
        }
        handle
    }

    /// Series key and style for samples of `handle`. Single-run samples
    /// without a device draw through the chart's accent.
    fn series_for(
        &mut self,
        handle: &ChartHandle,
        run_key: Option<&str>,
        device: Option<String>,
    ) -> (String, StyleHandle) {
        let key = match (run_key, device) {
            (None, None) => return (DEFAULT_SERIES_KEY.to_string(), handle.accent.clone()),
            (None, Some(device)) => device,
            (Some(run), None) => run.to_string(),
            (Some(run), Some(device)) => format!("{run}{RUN_SERIES_SEPARATOR}{device}"),
        };
        let color = self.palette.color_for_cached(&key, &mut self.palette_cache);
        (key, StyleHandle::new(Style::default().fg(color)))
    }

    /// Sort by title (stable) and recolor by position.
    fn sort_charts(&mut self) {
        self.all.sort_by(|a, b| a.title().cmp(b.title()));
        for (i, handle) in self.all.iter().enumerate() {
            handle
                .accent
                .store(Style::default().fg(self.palette.color_at(i)));
        }
    }

    /// Rebuild `filtered` from the applied pattern and reclamp pages.
    fn apply_filter(&mut self) {
        self.filtered = self
            .all
            .iter()
            .filter(|h| self.filter.matches_applied(h.title()))
            .cloned()
            .collect();
        let per_page = self.per_page();
        self.nav.update_total_pages(self.filtered.len(), per_page);
    }

    /// Fill the page grid; size on-page charts to the cell and park the
    /// rest. Only the handles' targets change, no chart is locked.
    fn load_current_page(&mut self) {
        let size = self.size();
        let dims = self.dims();
        let (start, end) = self.nav.page_bounds(self.filtered.len(), items_per_page(size));

        let mut page = vec![vec![None; size.cols]; size.rows];
        let mut on_page = HashSet::new();
        for (i, handle) in self.filtered[start..end].iter().enumerate() {
            page[i / size.cols][i % size.cols] = Some(handle.clone());
            on_page.insert(handle.title().to_string());
        }

        for handle in &self.all {
            if on_page.contains(handle.title()) {
                handle.target.set_size(dims.cell_w, dims.cell_h);
            } else {
                handle.target.park();
                handle.target.set_focused(false);
            }
        }
        self.current_page = page;
    }

    fn set_focus(&mut self, row: usize, col: usize) {
        let Some(handle) = self.cell(row, col).cloned() else {
            return;
        };
        self.clear_focus();
        handle.target.set_focused(true);
        self.focus.set(row, col, handle.title());
    }

    fn clear_focus(&mut self) {
        if let Some((row, col)) = self.focus.clear() {
            if let Some(handle) = self.cell(row, col) {
                handle.target.set_focused(false);
            }
        }
    }

    /// Put focus back on `title` if it is still on the page.
    fn restore_focus(&mut self, title: Option<String>) {
        let Some(title) = title else {
            return;
        };
        self.focus.clear();
        if let Some((row, col)) = self.find_on_page(&title) {
            self.set_focus(row, col);
        }
    }

    /// Reload the page after the chart set or filter changed, keeping focus.
    fn refresh_page(&mut self) {
        let title = self.focus.title().map(str::to_string);
        self.apply_filter();
        self.load_current_page();
        self.restore_focus(title);
    }

    /// Column of the chart body of column `col`, in grid coordinates. The
    /// plot area starts `graph_start_x` further right.
    fn body_origin_x(&self, col: usize) -> usize {
        col * self.dims().cell_w_with_padding + 1
    }
}

/// The metrics grid.
#[derive(Debug)]
pub struct MetricsGrid {
    state: RwLock<GridState>,
}

impl MetricsGrid {
    pub fn new(config: &DashConfig) -> Self {
        let (rows, cols) = config.metrics_grid();
        let size = GridSize { rows, cols };
        Self {
            state: RwLock::new(GridState {
                width: 0,
                height: 0,
                rows,
                cols,
                all: Vec::new(),
                by_title: HashMap::new(),
                filtered: Vec::new(),
                current_page: vec![vec![None; size.cols]; size.rows],
                nav: GridNavigator::default(),
                focus: Focus::None,
                filter: FilterState::new(config.filter_mode),
                inspecting: None,
                palette: Palette::from_scheme(config.color_scheme),
                palette_cache: PaletteCache::default(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GridState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GridState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Ingestion ----

    /// Ingest a batch for the single-run view. Returns whether a chart was
    /// created or any sample appended.
    pub fn process_history(&self, batch: &HistoryBatch) -> bool {
        self.ingest(None, batch)
    }

    /// Ingest a batch of one run; each metric's samples go into the series
    /// named `run_key` so several runs overlay in the same chart.
    pub fn process_run_history(&self, run_key: &str, batch: &HistoryBatch) -> bool {
        self.ingest(Some(run_key), batch)
    }

    fn ingest(&self, run_key: Option<&str>, batch: &HistoryBatch) -> bool {
        if batch.is_empty() {
            return false;
        }

        let (jobs, created) = {
            let mut state = self.write();
            let mut created = false;
            let mut jobs = Vec::with_capacity(batch.len());

            for (name, data) in batch {
                // Device metrics (gpu.N.temp, cpu.N.cpu_percent, ...) share a
                // chart titled from their definition, one series per device.
                let placement = place_metric(name);
                let title = placement.as_ref().map_or(name.as_str(), |p| p.title.as_str());
                let existing = state.by_title.get(title).cloned();
                let handle = match existing {
                    Some(handle) => handle,
                    None => {
                        created = true;
                        state.create_chart(title, placement.as_ref())
                    }
                };
                let device = placement.and_then(|p| p.series);
                let (key, style) = state.series_for(&handle, run_key, device);
                jobs.push(AppendJob {
                    handle,
                    key,
                    style,
                    data,
                });
            }

            if created {
                state.sort_charts();
                state.refresh_page();
            }
            (jobs, created)
        };

        let mut appended = false;
        for job in jobs {
            let mut chart = job.handle.lock();
            if !chart.has_series(&job.key) {
                chart.add_series(&job.key, job.style);
            }
            if !job.data.is_empty() {
                chart.add_data(&job.key, job.data);
                appended = true;
            }
        }
        created || appended
    }

    /// Drop `run_key`'s series (including its per-device series) from every
    /// chart.
    pub fn remove_run(&self, run_key: &str) {
        let handles = {
            let mut state = self.write();
            state.inspecting = None;
            state.refresh_page();
            state.all.clone()
        };

        let device_prefix = format!("{run_key}{RUN_SERIES_SEPARATOR}");
        let mut removed = 0usize;
        for handle in &handles {
            let mut chart = handle.lock();
            chart.end_inspection();
            for key in chart.series_keys() {
                if key == run_key || key.starts_with(&device_prefix) {
                    chart.remove_series(&key);
                    removed += 1;
                }
            }
        }
        tracing::debug!(run = run_key, series = removed, "removed run from metrics grid");
    }

    // ---- Layout and pagination ----

    /// Lay the grid out in a content area of `width × height` cells.
    pub fn update_dimensions(&self, width: usize, height: usize) {
        let mut state = self.write();
        if state.width == width && state.height == height {
            return;
        }
        state.width = width;
        state.height = height;
        state.refresh_page();
    }

    /// Move `direction` pages with wrap-around. Clears focus.
    pub fn navigate(&self, direction: i32) -> bool {
        let mut state = self.write();
        if !state.nav.navigate(direction) {
            return false;
        }
        state.clear_focus();
        state.inspecting = None;
        state.load_current_page();
        true
    }

    pub fn current_page(&self) -> usize {
        self.read().nav.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.read().nav.total_pages()
    }

    pub fn dims(&self) -> GridDims {
        self.read().dims()
    }

    pub fn size(&self) -> GridSize {
        self.read().size()
    }

    pub fn chart_count(&self) -> usize {
        self.read().all.len()
    }

    /// Titles of all charts in display order.
    pub fn chart_titles(&self) -> Vec<String> {
        self.read().all.iter().map(|h| h.title().to_string()).collect()
    }

    /// Titles passing the applied filter, in display order.
    pub fn filtered_titles(&self) -> Vec<String> {
        self.read()
            .filtered
            .iter()
            .map(|h| h.title().to_string())
            .collect()
    }

    /// Titles on the current page, row-major.
    pub fn page_titles(&self) -> Vec<String> {
        self.read()
            .page_handles()
            .map(|(_, _, h)| h.title().to_string())
            .collect()
    }

    pub fn chart(&self, title: &str) -> Option<ChartHandle> {
        self.read().by_title.get(title).cloned()
    }

    // ---- Filter ----

    pub fn enter_filter_mode(&self) {
        self.write().filter.enter();
    }

    pub fn set_filter_draft(&self, text: &str) {
        self.write().filter.set_draft(text);
    }

    /// Apply the draft and re-paginate.
    pub fn commit_filter(&self) {
        let mut state = self.write();
        state.filter.commit();
        state.refresh_page();
        tracing::debug!(pattern = %state.filter.applied, shown = state.filtered.len(), "filter applied");
    }

    /// Leave filter mode without changing what is shown.
    pub fn cancel_filter(&self) {
        self.write().filter.cancel();
    }

    pub fn clear_filter(&self) {
        let mut state = self.write();
        state.filter.clear();
        state.refresh_page();
    }

    pub fn toggle_filter_mode(&self) {
        let mut state = self.write();
        state.filter.toggle_mode();
        state.refresh_page();
    }

    pub fn is_filter_mode(&self) -> bool {
        self.read().filter.active
    }

    /// Draft while typing, otherwise the applied pattern.
    pub fn filter_query(&self) -> String {
        let state = self.read();
        if state.filter.active {
            state.filter.draft.clone()
        } else {
            state.filter.applied.clone()
        }
    }

    pub fn filter_match_mode(&self) -> MatchMode {
        self.read().filter.mode
    }

    /// Charts the draft would show if committed.
    pub fn preview_match_count(&self) -> usize {
        let state = self.read();
        state
            .all
            .iter()
            .filter(|h| state.filter.matches_draft(h.title()))
            .count()
    }

    // ---- Focus and pointer interaction ----

    pub fn focus(&self) -> Focus {
        self.read().focus.clone()
    }

    pub fn clear_focus(&self) {
        self.write().clear_focus();
    }

    /// Toggle focus on a cell. Empty cells only clear an existing focus on
    /// the same cell.
    pub fn handle_click(&self, row: usize, col: usize) {
        let mut state = self.write();
        let title = match state.cell(row, col) {
            Some(handle) => handle.title().to_string(),
            None if state.focus.is_cell(row, col) => String::new(),
            None => return,
        };
        match state.focus.click(row, col, title) {
            FocusChange::Cleared { previous: (r, c) } => {
                if let Some(handle) = state.cell(r, c) {
                    handle.target.set_focused(false);
                }
            }
            FocusChange::Moved { previous, current } => {
                if let Some(handle) = previous.and_then(|(r, c)| state.cell(r, c)) {
                    handle.target.set_focused(false);
                }
                if let Some(handle) = state.cell(current.0, current.1) {
                    handle.target.set_focused(true);
                }
            }
        }
    }

    /// Zoom the chart under the pointer. Focuses the cell first; zooms only
    /// when the pointer is over the plot area. Returns whether it zoomed.
    pub fn handle_wheel(&self, adjusted_x: usize, row: usize, col: usize, wheel_up: bool) -> bool {
        let (handle, body_x) = {
            let mut state = self.write();
            let Some(handle) = state.cell(row, col).cloned() else {
                return false;
            };
            if !state.focus.is_cell(row, col) {
                state.set_focus(row, col);
            }
            (handle, state.body_origin_x(col))
        };

        let mut chart = handle.lock();
        let Some(rel) = adjusted_x.checked_sub(body_x + chart.graph_start_x()) else {
            return false;
        };
        if rel >= chart.graph_width() {
            return false;
        }
        let direction = if wheel_up {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        };
        chart.handle_zoom(direction, rel);
        true
    }

    /// Begin inspecting the chart at `(row, col)`. With `synced`, every other
    /// chart on the page follows the same data X.
    pub fn start_inspection(&self, adjusted_x: usize, row: usize, col: usize, synced: bool) {
        let (handle, body_x, peers) = {
            let state = self.read();
            let Some(handle) = state.cell(row, col).cloned() else {
                return;
            };
            let peers = if synced { state.page_snapshot() } else { Vec::new() };
            (handle, state.body_origin_x(col), peers)
        };

        let anchor_x = {
            let mut chart = handle.lock();
            let Some(rel) = adjusted_x.checked_sub(body_x + chart.graph_start_x()) else {
                return;
            };
            if rel >= chart.graph_width() {
                return;
            }
            chart.start_inspection(rel);
            chart.inspection_data().map(|(x, _)| x)
        };
        let Some(anchor_x) = anchor_x else {
            return;
        };
        self.write().inspecting = Some(InspectionAnchor { row, col, synced });
        sync_inspection(&peers, &handle, anchor_x);
    }

    /// Move the active inspection to a new pointer column.
    pub fn update_inspection(&self, adjusted_x: usize) {
        let (handle, body_x, peers) = {
            let state = self.read();
            let Some(anchor) = state.inspecting else {
                return;
            };
            let Some(handle) = state.cell(anchor.row, anchor.col).cloned() else {
                return;
            };
            let peers = if anchor.synced {
                state.page_snapshot()
            } else {
                Vec::new()
            };
            (handle, state.body_origin_x(anchor.col), peers)
        };

        let anchor_x = {
            let mut chart = handle.lock();
            let origin = body_x + chart.graph_start_x();
            chart.update_inspection(adjusted_x.saturating_sub(origin));
            chart.inspection_data().map(|(x, _)| x)
        };
        if let Some(x) = anchor_x {
            sync_inspection(&peers, &handle, x);
        }
    }

    pub fn end_inspection(&self) {
        let targets = {
            let mut state = self.write();
            let Some(anchor) = state.inspecting.take() else {
                return;
            };
            if anchor.synced {
                state.page_snapshot()
            } else {
                state.cell(anchor.row, anchor.col).cloned().into_iter().collect()
            }
        };
        for handle in targets {
            handle.lock().end_inspection();
        }
    }

    pub fn is_inspecting(&self) -> bool {
        self.read().inspecting.is_some()
    }

    // ---- Rendering ----

    /// Snapshot the current page. Holds the read lock only while cloning
    /// handles; draw with [`GridView::draw_charts`] afterwards.
    pub fn view(&self) -> GridView {
        let state = self.read();
        let size = state.size();
        let per_page = items_per_page(size);
        let (page_start, page_end) = state.nav.page_bounds(state.filtered.len(), per_page);
        let cells = state
            .page_handles()
            .map(|(row, col, handle)| CellView {
                row,
                col,
                chart: handle.clone(),
                focused: state.focus.is_cell(row, col),
            })
            .collect();
        GridView {
            size,
            dims: state.dims(),
            cells,
            page_start,
            page_end,
            shown: state.filtered.len(),
            total: state.all.len(),
            total_pages: state.nav.total_pages(),
            filter_applied: state.filter.is_applied(),
        }
    }
}

/// Place every chart in `peers` except `source` at data X `x`. Each chart
/// is locked on its own.
fn sync_inspection(peers: &[ChartHandle], source: &ChartHandle, x: f64) {
    for handle in peers {
        if handle.ptr_eq(source) {
            continue;
        }
        handle.lock().inspect_at_data_x(x);
    }
}
