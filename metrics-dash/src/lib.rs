//! Live terminal dashboard for training-run metrics
//!
//! This crate provides:
//! - Braille line charts with per-series styling, zoom and inspection
//! - A paged, filterable grid of charts keyed by metric title
//! - Cross-chart synchronized inspection
//! - Multi-run overlays with stable per-run colors
//! - A JSON-lines history tailer feeding the grid from a background thread
//!
//! # Binaries
//!
//! - `metrics-dash` - Tail a history file and display it in the terminal

pub mod braille;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod filter;
pub mod focus;
pub mod format;
pub mod grid;
pub mod layout;
pub mod metric_defs;
pub mod palette;
pub mod series;
pub mod viewport;

pub use chart::{Chart, ChartStyles, Inspection, ZoomDirection};
pub use config::{DashConfig, GridConfig};
pub use dashboard::Dashboard;
pub use error::{DashError, Result};
pub use feed::{spawn_reader, FeedHandle, HistoryReader};
pub use filter::{FilterState, MatchMode};
pub use focus::Focus;
pub use format::Unit;
pub use grid::{ChartHandle, GridView, MetricsGrid};
pub use layout::{GridDims, GridNavigator, GridSize};
pub use palette::{ColorScheme, Palette, StyleHandle};
pub use series::{HistoryBatch, MetricData, Series};
