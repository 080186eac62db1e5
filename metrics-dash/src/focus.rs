//! Which grid cell has focus.

/// Focus state of the metrics grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    Chart {
        row: usize,
        col: usize,
        title: String,
    },
}

/// Outcome of a click, telling the caller which charts to (un)flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusChange {
    /// The focused cell was clicked again.
    Cleared { previous: (usize, usize) },
    Moved {
        previous: Option<(usize, usize)>,
        current: (usize, usize),
    },
}

impl Focus {
    pub fn is_none(&self) -> bool {
        matches!(self, Focus::None)
    }

    /// Focused `(row, col)`.
    pub fn cell(&self) -> Option<(usize, usize)> {
        match self {
            Focus::None => None,
            Focus::Chart { row, col, .. } => Some((*row, *col)),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Focus::None => None,
            Focus::Chart { title, .. } => Some(title),
        }
    }

    pub fn is_cell(&self, row: usize, col: usize) -> bool {
        self.cell() == Some((row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, title: impl Into<String>) {
        *self = Focus::Chart {
            row,
            col,
            title: title.into(),
        };
    }

    /// Clear focus, returning the cell that had it.
    pub fn clear(&mut self) -> Option<(usize, usize)> {
        let previous = self.cell();
        *self = Focus::None;
        previous
    }

    /// Toggle semantics: clicking the focused cell clears focus, clicking any
    /// other cell moves focus there.
    pub fn click(&mut self, row: usize, col: usize, title: impl Into<String>) -> FocusChange {
        if self.is_cell(row, col) {
            self.clear();
            return FocusChange::Cleared {
                previous: (row, col),
            };
        }
        let previous = self.clear();
        self.set(row, col, title);
        FocusChange::Moved {
            previous,
            current: (row, col),
        }
    }
}
