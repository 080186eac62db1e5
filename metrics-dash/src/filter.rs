//! Chart title filtering.
//!
//! A filter has two texts: the draft being typed and the applied pattern the
//! grid is showing. Only [`FilterState::commit`] changes what is displayed.

use serde::{Deserialize, Serialize};

/// How a filter pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// `*` and `?` wildcards; plain text falls back to a substring test.
    #[default]
    Glob,
    /// Case-insensitive substring test, wildcards taken literally.
    Literal,
}

impl MatchMode {
    pub fn toggled(self) -> Self {
        match self {
            MatchMode::Glob => MatchMode::Literal,
            MatchMode::Literal => MatchMode::Glob,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchMode::Glob => "glob",
            MatchMode::Literal => "literal",
        }
    }
}

/// Draft/applied filter text and the current mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Filter input is open.
    pub active: bool,
    pub draft: String,
    pub applied: String,
    pub mode: MatchMode,
}

impl FilterState {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Open filter input, starting the draft from the applied pattern.
    pub fn enter(&mut self) {
        self.active = true;
        self.draft = self.applied.clone();
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Apply the draft and close input.
    pub fn commit(&mut self) {
        self.applied = self.draft.clone();
        self.active = false;
    }

    /// Close input, reverting the draft to what is applied.
    pub fn cancel(&mut self) {
        self.draft = self.applied.clone();
        self.active = false;
    }

    /// Show everything again.
    pub fn clear(&mut self) {
        self.draft.clear();
        self.applied.clear();
        self.active = false;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn is_applied(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn matches_applied(&self, title: &str) -> bool {
        matches(&self.applied, self.mode, title)
    }

    pub fn matches_draft(&self, title: &str) -> bool {
        matches(&self.draft, self.mode, title)
    }
}

/// Whether `title` passes `pattern` under `mode`. Case-insensitive.
pub fn matches(pattern: &str, mode: MatchMode, title: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    let pattern = pattern.to_lowercase();
    let title = title.to_lowercase();

    match mode {
        MatchMode::Literal => title.contains(&pattern),
        MatchMode::Glob => {
            if pattern == "*" {
                return true;
            }
            if !pattern.contains(['*', '?']) {
                return title.contains(&pattern);
            }
            let mut anchored = String::with_capacity(pattern.len() + 2);
            if !pattern.starts_with('*') {
                anchored.push('*');
            }
            anchored.push_str(&pattern);
            if !pattern.ends_with('*') {
                anchored.push('*');
            }
            glob_match(&anchored, &title)
        }
    }
}

/// Wildcard match of the whole `text`: `*` is any run, `?` any one char.
///
/// Iterative with single-star backtracking, so it never recurses.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it was tried at.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
