//! Dashboard configuration, persisted as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::filter::MatchMode;
use crate::palette::ColorScheme;

/// Largest grid dimension accepted from config or CLI.
pub const MAX_GRID_DIM: usize = 9;

/// Requested metrics grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: 4, cols: 3 }
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Metrics grid shape
    pub metrics_grid: GridConfig,
    /// Series color scheme
    pub color_scheme: ColorScheme,
    /// Initial filter match mode
    pub filter_mode: MatchMode,
    /// UI tick interval in milliseconds
    pub refresh_ms: u64,
    /// Pending feed batches before the reader blocks
    pub channel_capacity: usize,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            metrics_grid: GridConfig::default(),
            color_scheme: ColorScheme::default(),
            filter_mode: MatchMode::default(),
            refresh_ms: 100,
            channel_capacity: 64,
        }
    }
}

impl DashConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "saved config");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let grid = self.metrics_grid;
        if !(1..=MAX_GRID_DIM).contains(&grid.rows) {
            return Err(DashError::invalid_config(format!(
                "metrics_grid.rows must be in 1..={MAX_GRID_DIM}, got {}",
                grid.rows
            )));
        }
        if !(1..=MAX_GRID_DIM).contains(&grid.cols) {
            return Err(DashError::invalid_config(format!(
                "metrics_grid.cols must be in 1..={MAX_GRID_DIM}, got {}",
                grid.cols
            )));
        }
        if self.refresh_ms == 0 {
            return Err(DashError::invalid_config("refresh_ms must be positive"));
        }
        if self.channel_capacity == 0 {
            return Err(DashError::invalid_config("channel_capacity must be positive"));
        }
        Ok(())
    }

    /// Set grid rows, clamped to `1..=9`.
    pub fn set_metrics_rows(&mut self, rows: usize) {
        self.metrics_grid.rows = rows.clamp(1, MAX_GRID_DIM);
    }

    /// Set grid columns, clamped to `1..=9`.
    pub fn set_metrics_cols(&mut self, cols: usize) {
        self.metrics_grid.cols = cols.clamp(1, MAX_GRID_DIM);
    }

    pub fn metrics_grid(&self) -> (usize, usize) {
        (self.metrics_grid.rows, self.metrics_grid.cols)
    }
}
