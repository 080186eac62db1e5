//! Grid geometry and pagination.

/// Narrowest chart body, in cells.
pub const MIN_CHART_WIDTH: usize = 20;
/// Shortest chart body, in cells.
pub const MIN_CHART_HEIGHT: usize = 5;
/// Lines above the grid (section header with navigation info).
pub const CHART_HEADER_HEIGHT: usize = 1;
/// Left and right border of a cell.
pub const CELL_BORDER_WIDTH: usize = 2;
/// Top and bottom border plus the title line of a cell.
pub const CELL_CHROME_HEIGHT: usize = 3;

/// Requested grid shape and its constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub min_cell_w: usize,
    pub min_cell_h: usize,
    pub header_lines: usize,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            min_cell_w: MIN_CHART_WIDTH,
            min_cell_h: MIN_CHART_HEIGHT,
            header_lines: CHART_HEADER_HEIGHT,
        }
    }
}

/// Rows and columns actually shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

/// Per-cell sizes: the chart body and the full cell with its chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridDims {
    pub cell_w: usize,
    pub cell_h: usize,
    pub cell_w_with_padding: usize,
    pub cell_h_with_padding: usize,
}

/// Reduce the requested grid to what fits at the minimum chart size.
/// Never below 1×1.
pub fn effective_grid_size(width: usize, height: usize, spec: GridSpec) -> GridSize {
    let avail_h = height.saturating_sub(spec.header_lines);
    let min_w = spec.min_cell_w + CELL_BORDER_WIDTH;
    let min_h = spec.min_cell_h + CELL_CHROME_HEIGHT;

    let fit_cols = (width / min_w).max(1);
    let fit_rows = (avail_h / min_h).max(1);
    GridSize {
        rows: spec.rows.max(1).min(fit_rows),
        cols: spec.cols.max(1).min(fit_cols),
    }
}

/// Split the content area among the effective grid.
pub fn compute_grid_dims(width: usize, height: usize, spec: GridSpec) -> GridDims {
    let size = effective_grid_size(width, height, spec);
    let avail_h = height.saturating_sub(spec.header_lines);

    let cell_w_with_padding = width / size.cols;
    let cell_h_with_padding = avail_h / size.rows;
    GridDims {
        cell_w: cell_w_with_padding
            .saturating_sub(CELL_BORDER_WIDTH)
            .max(spec.min_cell_w),
        cell_h: cell_h_with_padding
            .saturating_sub(CELL_CHROME_HEIGHT)
            .max(spec.min_cell_h),
        cell_w_with_padding,
        cell_h_with_padding,
    }
}

pub fn items_per_page(size: GridSize) -> usize {
    size.rows * size.cols
}

/// Current page within `total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridNavigator {
    current_page: usize,
    total_pages: usize,
}

impl GridNavigator {
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Step pages with wrap-around. Returns whether the page changed.
    pub fn navigate(&mut self, direction: i32) -> bool {
        if self.total_pages <= 1 || direction == 0 {
            return false;
        }
        let total = self.total_pages as i64;
        let next = (self.current_page as i64 + i64::from(direction)).rem_euclid(total) as usize;
        if next == self.current_page {
            return false;
        }
        self.current_page = next;
        true
    }

    /// Recompute the page count for `items`, clamping the current page.
    pub fn update_total_pages(&mut self, items: usize, per_page: usize) {
        self.total_pages = if per_page == 0 {
            0
        } else {
            items.div_ceil(per_page)
        };
        if self.current_page >= self.total_pages {
            self.current_page = self.total_pages.saturating_sub(1);
        }
    }

    /// Item index range `[start, end)` of the current page.
    pub fn page_bounds(&self, items: usize, per_page: usize) -> (usize, usize) {
        let start = (self.current_page * per_page).min(items);
        let end = (start + per_page).min(items);
        (start, end)
    }
}
