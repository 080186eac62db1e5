//! Integration tests for metrics-dash
//!
//! Tests cover:
//! 1. Grid ingestion, ordering and filtering
//! 2. Pagination across resizes
//! 3. Config persistence
//! 4. History file tailing
//! 5. Concurrent ingestion while rendering

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metrics_dash::{
    spawn_reader, DashConfig, HistoryBatch, HistoryReader, MatchMode, MetricData, MetricsGrid,
};

fn grid(rows: usize, cols: usize) -> MetricsGrid {
    let mut config = DashConfig::default();
    config.set_metrics_rows(rows);
    config.set_metrics_cols(cols);
    let grid = MetricsGrid::new(&config);
    grid.update_dimensions(200, 80);
    grid
}

fn batch(names: &[&str], step: f64) -> HistoryBatch {
    names
        .iter()
        .map(|n| (n.to_string(), MetricData::point(step, step)))
        .collect()
}

fn apply_filter(grid: &MetricsGrid, pattern: &str) {
    grid.enter_filter_mode();
    grid.set_filter_draft(pattern);
    grid.commit_filter();
}

// ============================================================================
// Test 1: Grid Ingestion, Ordering and Filtering
// ============================================================================

#[test]
fn test_filter_scenario() {
    let grid = grid(4, 3);
    grid.process_history(&batch(&["train/loss", "accuracy", "val/accuracy"], 1.0));

    apply_filter(&grid, "loss");
    assert_eq!(grid.filtered_titles(), vec!["train/loss"]);

    apply_filter(&grid, "acc");
    assert_eq!(grid.filtered_titles(), vec!["accuracy", "val/accuracy"]);

    grid.clear_filter();
    assert_eq!(
        grid.filtered_titles(),
        vec!["accuracy", "train/loss", "val/accuracy"]
    );
}

#[test]
fn test_filtered_is_ordered_subsequence() {
    let grid = grid(2, 2);
    let names = ["z/loss", "a/loss", "m/acc", "b/loss", "c/acc"];
    for (i, name) in names.iter().enumerate() {
        grid.process_history(&batch(&[name], i as f64));
    }

    let all = grid.chart_titles();
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted);

    apply_filter(&grid, "*loss");
    let filtered = grid.filtered_titles();
    assert_eq!(filtered, vec!["a/loss", "b/loss", "z/loss"]);
    let mut it = all.iter();
    assert!(filtered.iter().all(|t| it.any(|a| a == t)));
}

#[test]
fn test_literal_mode_takes_wildcards_literally() {
    let grid = grid(2, 2);
    grid.process_history(&batch(&["loss*scaled", "loss"], 1.0));

    grid.enter_filter_mode();
    grid.toggle_filter_mode();
    assert_eq!(grid.filter_match_mode(), MatchMode::Literal);
    grid.set_filter_draft("loss*");
    assert_eq!(grid.preview_match_count(), 1);
    grid.commit_filter();
    assert_eq!(grid.filtered_titles(), vec!["loss*scaled"]);
}

#[test]
fn test_samples_accumulate_per_chart() {
    let grid = grid(2, 2);
    for step in 0..10 {
        grid.process_history(&batch(&["loss"], f64::from(step)));
    }
    let loss = grid.chart("loss").expect("loss chart");
    let chart = loss.lock();
    assert_eq!(chart.series("default").map(|s| s.len()), Some(10));
    let (x_min, x_max, y_min, y_max) = chart.bounds();
    assert_eq!((x_min, x_max), (0.0, 9.0));
    assert_eq!((y_min, y_max), (0.0, 9.0));
}

// ============================================================================
// Test 2: Pagination Across Resizes
// ============================================================================

#[test]
fn test_total_pages_is_ceiling() {
    let grid = grid(2, 2);
    let names: Vec<String> = (0..9).map(|i| format!("m{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    grid.process_history(&batch(&refs, 1.0));
    assert_eq!(grid.total_pages(), 3);
    assert_eq!(grid.page_titles().len(), 4);

    grid.navigate(-1);
    assert_eq!(grid.current_page(), 2);
    assert_eq!(grid.page_titles(), vec!["m8"]);
}

#[test]
fn test_small_terminal_shrinks_grid() {
    let grid = grid(4, 3);
    grid.process_history(&batch(&["a", "b", "c", "d"], 1.0));

    // Room for a single 20×5 chart only.
    grid.update_dimensions(30, 10);
    let size = grid.size();
    assert_eq!((size.rows, size.cols), (1, 1));
    assert_eq!(grid.total_pages(), 4);
    assert_eq!(grid.page_titles(), vec!["a"]);

    grid.update_dimensions(200, 80);
    assert_eq!(grid.total_pages(), 1);
    assert_eq!(grid.page_titles().len(), 4);
}

#[test]
fn test_resize_keeps_focus_by_title() {
    let grid = grid(2, 2);
    grid.process_history(&batch(&["a", "b"], 1.0));
    grid.handle_click(0, 1);
    assert_eq!(grid.focus().title(), Some("b"));

    grid.update_dimensions(160, 60);
    assert_eq!(grid.focus().title(), Some("b"));
    assert!(grid.chart("b").expect("b").lock().is_focused());
}

// ============================================================================
// Test 3: Config Persistence
// ============================================================================

#[test]
fn test_config_save_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("dash.json");

    let mut config = DashConfig::default();
    config.set_metrics_rows(2);
    config.set_metrics_cols(5);
    config.filter_mode = MatchMode::Literal;
    config.save(&path).expect("save");

    let loaded = DashConfig::load(&path).expect("load");
    assert_eq!(loaded, config);
    assert_eq!(loaded.metrics_grid(), (2, 5));
}

#[test]
fn test_config_missing_file_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DashConfig::load_or_default(&dir.path().join("absent.json")).expect("defaults");
    assert_eq!(config, DashConfig::default());
}

#[test]
fn test_config_rejects_invalid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dash.json");
    fs::write(&path, r#"{"metrics_grid": {"rows": 0, "cols": 3}}"#).expect("write");
    assert!(DashConfig::load(&path).is_err());

    fs::write(&path, "not json").expect("write");
    assert!(DashConfig::load(&path).is_err());
}

// ============================================================================
// Test 4: History File Tailing
// ============================================================================

fn append(path: &std::path::Path, text: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open history");
    file.write_all(text.as_bytes()).expect("append");
}

#[test]
fn test_reader_tails_appended_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history.jsonl");
    let mut reader = HistoryReader::new(&path);

    assert!(reader.poll().expect("poll").is_empty());

    append(&path, "{\"_step\": 0, \"loss\": 1.0}\n{\"_step\": 1, \"loss\": 0.5}\n");
    let batch = reader.poll().expect("poll");
    assert_eq!(batch["loss"].x, vec![0.0, 1.0]);
    assert_eq!(batch["loss"].y, vec![1.0, 0.5]);

    assert!(reader.poll().expect("poll").is_empty());
    assert_eq!(reader.lines_read(), 2);
}

#[test]
fn test_reader_waits_for_complete_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history.jsonl");
    let mut reader = HistoryReader::new(&path);

    append(&path, "{\"_step\": 3, \"lo");
    assert!(reader.poll().expect("poll").is_empty());

    append(&path, "ss\": 2.5}\n");
    let batch = reader.poll().expect("poll");
    assert_eq!(batch["loss"].x, vec![3.0]);
    assert_eq!(batch["loss"].y, vec![2.5]);
}

#[test]
fn test_reader_skips_bad_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history.jsonl");
    append(&path, "{\"_step\": 0, \"loss\": 1.0}\ngarbage\n\n{\"loss\": 0.7}\n");

    let mut reader = HistoryReader::new(&path);
    let batch = reader.poll().expect("poll");
    // The line without `_step` continues from the previous step.
    assert_eq!(batch["loss"].x, vec![0.0, 1.0]);
    assert_eq!(batch["loss"].y, vec![1.0, 0.7]);
}

#[test]
fn test_reader_restarts_after_truncation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history.jsonl");
    append(&path, "{\"_step\": 0, \"loss\": 1.0}\n{\"_step\": 1, \"loss\": 0.9}\n");

    let mut reader = HistoryReader::new(&path);
    assert_eq!(reader.poll().expect("poll")["loss"].len(), 2);

    fs::write(&path, "{\"_step\": 0, \"acc\": 0.1}\n").expect("truncate");
    let batch = reader.poll().expect("poll");
    assert_eq!(batch["acc"].x, vec![0.0]);
    assert!(!batch.contains_key("loss"));
}

#[test]
fn test_spawned_reader_feeds_grid() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("history.jsonl");
    append(&path, "{\"_step\": 0, \"train/loss\": 2.0, \"val/loss\": 2.1}\n");

    let feed = spawn_reader(&path, 4, Duration::from_millis(5)).expect("spawn reader");
    let batch = feed
        .batches
        .recv_timeout(Duration::from_secs(5))
        .expect("first batch");

    let grid = grid(2, 2);
    assert!(grid.process_history(&batch));
    assert_eq!(grid.chart_titles(), vec!["train/loss", "val/loss"]);
    feed.shutdown();
}

// ============================================================================
// Test 5: Concurrent Ingestion While Rendering
// ============================================================================

#[test]
fn test_concurrent_ingest_and_view() {
    let grid = Arc::new(grid(2, 2));
    let writer = {
        let grid = Arc::clone(&grid);
        thread::spawn(move || {
            for step in 0..200 {
                let s = f64::from(step);
                grid.process_history(&batch(&["loss", "acc", "lr"], s));
            }
        })
    };

    for _ in 0..50 {
        let view = grid.view();
        view.draw_charts();
        assert!(view.cells.len() <= 4);
    }
    writer.join().expect("writer thread");

    assert_eq!(grid.chart_count(), 3);
    let loss = grid.chart("loss").expect("loss");
    assert_eq!(loss.lock().series("default").map(|s| s.len()), Some(200));
}
