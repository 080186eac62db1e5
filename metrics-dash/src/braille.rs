//! Braille sub-cell rasterizer.
//!
//! Each terminal cell holds a 2×4 grid of dots (U+2800..U+28FF), giving line
//! charts eight times the resolution of plain characters.

/// Empty braille pattern.
pub const BRAILLE_BLANK: char = '\u{2800}';

/// Sub-pixel columns per cell.
pub const DOTS_X: usize = 2;
/// Sub-pixel rows per cell.
pub const DOTS_Y: usize = 4;

// Braille dot numbering to bit mapping:
// dot 1 (0,0) = bit 0    dot 4 (1,0) = bit 3
// dot 2 (0,1) = bit 1    dot 5 (1,1) = bit 4
// dot 3 (0,2) = bit 2    dot 6 (1,2) = bit 5
// dot 7 (0,3) = bit 6    dot 8 (1,3) = bit 7
const DOT_BITS: [[u8; DOTS_Y]; DOTS_X] = [[0, 1, 2, 6], [3, 4, 5, 7]];

/// A point in sub-pixel coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sub-pixel bitmap covering `cols × rows` terminal cells.
#[derive(Debug, Clone)]
pub struct BrailleGrid {
    cols: usize,
    rows: usize,
    /// One byte of dot bits per cell, row-major.
    cells: Vec<u8>,
}

impl BrailleGrid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn pixel_width(&self) -> i32 {
        (self.cols * DOTS_X) as i32
    }

    pub fn pixel_height(&self) -> i32 {
        (self.rows * DOTS_Y) as i32
    }

    /// Map a point in cell units (`x in [0, cols]`, `y in [0, rows]`, y up)
    /// to a sub-pixel, clamped to the grid.
    pub fn grid_point(&self, x: f64, y: f64) -> PixelPoint {
        let max_x = (self.pixel_width() - 1).max(0);
        let max_y = (self.pixel_height() - 1).max(0);
        let px = ((x * DOTS_X as f64).floor() as i32).clamp(0, max_x);
        let py_up = ((y * DOTS_Y as f64).floor() as i32).clamp(0, max_y);
        PixelPoint::new(px, max_y - py_up)
    }

    /// Turn on one dot. Out-of-range points are ignored.
    pub fn set(&mut self, p: PixelPoint) {
        if p.x < 0 || p.y < 0 || p.x >= self.pixel_width() || p.y >= self.pixel_height() {
            return;
        }
        let (x, y) = (p.x as usize, p.y as usize);
        let idx = (y / DOTS_Y) * self.cols + x / DOTS_X;
        self.cells[idx] |= 1 << DOT_BITS[x % DOTS_X][y % DOTS_Y];
    }

    pub fn is_set(&self, p: PixelPoint) -> bool {
        if p.x < 0 || p.y < 0 || p.x >= self.pixel_width() || p.y >= self.pixel_height() {
            return false;
        }
        let (x, y) = (p.x as usize, p.y as usize);
        let idx = (y / DOTS_Y) * self.cols + x / DOTS_X;
        self.cells[idx] & (1 << DOT_BITS[x % DOTS_X][y % DOTS_Y]) != 0
    }

    /// Braille character of one cell.
    pub fn pattern_at(&self, col: usize, row: usize) -> char {
        if col >= self.cols || row >= self.rows {
            return BRAILLE_BLANK;
        }
        let bits = self.cells[row * self.cols + col];
        char::from_u32(BRAILLE_BLANK as u32 + u32::from(bits)).unwrap_or(BRAILLE_BLANK)
    }

    /// All cells as rows of braille characters.
    pub fn patterns(&self) -> Vec<Vec<char>> {
        (0..self.rows)
            .map(|row| (0..self.cols).map(|col| self.pattern_at(col, row)).collect())
            .collect()
    }
}

/// Draw a line between two sub-pixels with Bresenham's algorithm, both
/// endpoints included.
pub fn draw_line(grid: &mut BrailleGrid, p1: PixelPoint, p2: PixelPoint) {
    let dx = (p2.x - p1.x).abs();
    let dy = (p2.y - p1.y).abs();
    let sx = if p1.x > p2.x { -1 } else { 1 };
    let sy = if p1.y > p2.y { -1 } else { 1 };

    let mut err = dx - dy;
    let (mut x, mut y) = (p1.x, p1.y);

    loop {
        grid.set(PixelPoint::new(x, y));
        if x == p2.x && y == p2.y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}
