//! Visual tests for the dashboard, rendered into a `TestBackend`.
//!
//! Run with: `cargo test -p metrics-dash --test visual_tests`

use std::sync::Arc;

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;

use metrics_dash::dashboard::colors;
use metrics_dash::{DashConfig, Dashboard, HistoryBatch, MetricData, MetricsGrid};

const WIDTH: u16 = 80;
const HEIGHT: u16 = 24;

fn dashboard(names: &[&str]) -> Dashboard {
    let mut config = DashConfig::default();
    config.set_metrics_rows(2);
    config.set_metrics_cols(2);
    let grid = Arc::new(MetricsGrid::new(&config));

    let xs: Vec<f64> = (0..50).map(f64::from).collect();
    let mut batch = HistoryBatch::new();
    for (i, name) in names.iter().enumerate() {
        let ys = xs.iter().map(|x| (x * 0.2 + i as f64).sin()).collect();
        batch.insert(name.to_string(), MetricData::new(xs.clone(), ys));
    }
    grid.process_history(&batch);
    Dashboard::new(grid, &config)
}

fn render(dash: &mut Dashboard) -> Buffer {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).expect("terminal");
    terminal.draw(|f| dash.draw(f)).expect("draw");
    terminal.backend().buffer().clone()
}

fn row_text(buf: &Buffer, y: u16) -> String {
    (0..buf.area.width)
        .filter_map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()))
        .collect()
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn is_braille(symbol: &str) -> bool {
    symbol
        .chars()
        .next()
        .is_some_and(|c| ('\u{2801}'..='\u{28FF}').contains(&c))
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_header_and_titles() {
    let mut dash = dashboard(&["train/loss", "val/loss", "accuracy"]);
    let buf = render(&mut dash);

    assert!(row_text(&buf, 0).starts_with("Metrics [1-3 of 3]"));
    // Title line sits just inside each cell's top border.
    let titles = row_text(&buf, 2);
    assert!(titles.contains("accuracy"));
    assert!(titles.contains("train/loss"));
    assert!(row_text(&buf, 13).contains("val/loss"));
}

#[test]
fn test_charts_draw_braille() {
    let mut dash = dashboard(&["loss"]);
    let buf = render(&mut dash);
    let braille = buf.content().iter().filter(|c| is_braille(c.symbol())).count();
    assert!(braille > 0);
}

#[test]
fn test_grid_sized_to_frame() {
    let mut dash = dashboard(&["a"]);
    render(&mut dash);
    let dims = dash.grid().dims();
    assert_eq!(dims.cell_w_with_padding, 40);
    assert_eq!(dims.cell_h_with_padding, 11);
    let handle = dash.grid().chart("a").expect("a");
    let chart = handle.lock();
    assert_eq!((chart.width(), chart.height()), (38, 8));
}

// ============================================================================
// Interaction
// ============================================================================

#[test]
fn test_click_highlights_border() {
    let mut dash = dashboard(&["a", "b"]);
    render(&mut dash);

    dash.handle_mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: 45,
        row: 3,
        modifiers: KeyModifiers::NONE,
    });
    assert_eq!(dash.grid().focus().title(), Some("b"));

    let buf = render(&mut dash);
    assert_eq!(buf.cell((40, 1)).map(|c| c.fg), Some(colors::FOCUSED_BORDER));
    assert_eq!(buf.cell((0, 1)).map(|c| c.fg), Some(colors::BORDER));
}

#[test]
fn test_filter_prompt_and_commit() {
    let mut dash = dashboard(&["train/loss", "val/loss", "accuracy"]);
    render(&mut dash);

    dash.handle_key(key(KeyCode::Char('/')));
    for c in "lossx".chars() {
        dash.handle_key(key(KeyCode::Char(c)));
    }
    dash.handle_key(key(KeyCode::Backspace));

    let buf = render(&mut dash);
    let status = row_text(&buf, HEIGHT - 1);
    assert!(status.starts_with("Filter (glob): loss_"));
    assert!(status.contains("[2 matches]"));
    // Typing does not change what is shown.
    assert!(row_text(&buf, 0).starts_with("Metrics [1-3 of 3]"));

    dash.handle_key(key(KeyCode::Enter));
    let buf = render(&mut dash);
    assert!(row_text(&buf, 0).starts_with("Metrics [1-2 of 2 filtered from 3 total]"));
    assert!(row_text(&buf, HEIGHT - 1).contains("filter: loss"));

    dash.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
    assert_eq!(dash.grid().filtered_titles().len(), 3);
}

#[test]
fn test_keys_page_and_quit() {
    let names: Vec<String> = (0..6).map(|i| format!("m{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut dash = dashboard(&refs);
    render(&mut dash);
    assert_eq!(dash.grid().total_pages(), 2);

    dash.handle_key(key(KeyCode::PageDown));
    assert_eq!(dash.grid().current_page(), 1);
    let buf = render(&mut dash);
    assert!(row_text(&buf, 0).starts_with("Metrics [5-6 of 6]"));

    dash.handle_key(key(KeyCode::Char('N')));
    assert_eq!(dash.grid().current_page(), 0);

    assert!(!dash.should_quit());
    dash.handle_key(key(KeyCode::Char('q')));
    assert!(dash.should_quit());
}

#[test]
fn test_right_drag_inspects() {
    let mut dash = dashboard(&["loss"]);
    render(&mut dash);
    let start = 1 + dash.grid().chart("loss").expect("loss").lock().graph_start_x() as u16;

    dash.handle_mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Right),
        column: start + 2,
        row: 5,
        modifiers: KeyModifiers::NONE,
    });
    assert!(dash.grid().is_inspecting());

    let buf = render(&mut dash);
    let legend = (1..12).any(|y| row_text(&buf, y).contains("▬▬"));
    assert!(legend);

    dash.handle_mouse(MouseEvent {
        kind: MouseEventKind::Up(MouseButton::Right),
        column: start + 2,
        row: 5,
        modifiers: KeyModifiers::NONE,
    });
    assert!(!dash.grid().is_inspecting());
}

#[test]
fn test_wheel_zooms_focused_chart() {
    let mut dash = dashboard(&["loss"]);
    render(&mut dash);
    let start = 1 + dash.grid().chart("loss").expect("loss").lock().graph_start_x() as u16;

    dash.handle_mouse(MouseEvent {
        kind: MouseEventKind::ScrollUp,
        column: start + 10,
        row: 6,
        modifiers: KeyModifiers::NONE,
    });
    let chart = dash.grid().chart("loss").expect("loss");
    assert!(chart.lock().is_zoomed());
    assert_eq!(dash.grid().focus().title(), Some("loss"));
}
