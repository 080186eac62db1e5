//! Metrics dashboard binary.
//!
//! Usage:
//!   metrics-dash <history.jsonl> [--rows N] [--cols N] [--config <path>]
//!
//! Hotkeys:
//!   q - Quit
//!   / - Filter charts (Tab toggles glob/literal, Enter applies, Esc cancels)
//!   Ctrl+L - Clear filter
//!   PgUp/PgDn or N/n - Change page
//!   Esc - Clear focus
//!
//! Mouse:
//!   click focuses a chart, wheel zooms, right-drag inspects (hold Alt to
//!   inspect every chart on the page at once).

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metrics_dash::{feed, DashConfig, Dashboard, MatchMode, MetricsGrid};

#[derive(Parser)]
#[command(name = "metrics-dash")]
#[command(about = "Live terminal dashboard for training-run metrics")]
#[command(version)]
struct Args {
    /// JSON-lines history file to tail
    history: PathBuf,

    /// Grid rows (1-9)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns (1-9)
    #[arg(long)]
    cols: Option<usize>,

    /// Dashboard config file
    #[arg(short, long, default_value = "metrics-dash.json")]
    config: PathBuf,

    /// Write the effective config back to --config
    #[arg(long)]
    save_config: bool,

    /// Match filters literally instead of as globs
    #[arg(long)]
    literal: bool,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, default_value = "metrics-dash.log")]
    log_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let log = File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
                .add_directive("metrics_dash=debug".parse()?),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut config = DashConfig::load_or_default(&args.config)?;
    if let Some(rows) = args.rows {
        config.set_metrics_rows(rows);
    }
    if let Some(cols) = args.cols {
        config.set_metrics_cols(cols);
    }
    if args.literal {
        config.filter_mode = MatchMode::Literal;
    }
    if args.save_config {
        config.save(&args.config)?;
    }

    let (rows, cols) = config.metrics_grid();
    tracing::info!(history = %args.history.display(), rows, cols, "starting dashboard");

    let feed = feed::spawn_reader(
        &args.history,
        config.channel_capacity,
        Duration::from_millis(config.refresh_ms),
    )?;
    let grid = Arc::new(MetricsGrid::new(&config));
    let title = args
        .history
        .file_name()
        .map(|name| format!("Metrics: {}", name.to_string_lossy()))
        .unwrap_or_else(|| "Metrics".to_string());

    let mut dashboard = Dashboard::new(grid, &config).with_title(title);
    dashboard.run(Some(feed))?;

    Ok(())
}
