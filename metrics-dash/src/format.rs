//! Number and label formatting for chart axes, legends and titles.

use ratatui::text::Span;
use serde::{Deserialize, Serialize};

/// Display unit of a chart's Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Unit {
    /// Plain number with SI suffixes (k, M, G, T)
    #[default]
    Scalar,
    Percent,
    Celsius,
    Watts,
    MegaHertz,
    Bytes,
    MegaBytes,
    GigaBytes,
}

impl Unit {
    /// Short unit string shown next to chart titles; empty for plain numbers.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Scalar => "",
            Unit::Percent => "%",
            Unit::Celsius => "°C",
            Unit::Watts => "W",
            Unit::MegaHertz => "MHz",
            Unit::Bytes => "B",
            Unit::MegaBytes => "MB",
            Unit::GigaBytes => "GB",
        }
    }

    /// Format a value for an axis label.
    pub fn format(self, v: f64) -> String {
        if !v.is_finite() {
            return v.to_string();
        }
        match self {
            Unit::Scalar => format_si(v),
            Unit::Percent => format!("{}%", format_sig_figs(v, 3)),
            Unit::Celsius => format!("{}°C", format_sig_figs(v, 3)),
            Unit::Watts => format!("{}W", format_sig_figs(v, 3)),
            Unit::MegaHertz => {
                if v.abs() >= 1000.0 {
                    format!("{}GHz", format_sig_figs(v / 1000.0, 3))
                } else {
                    format!("{}MHz", format_sig_figs(v, 3))
                }
            }
            Unit::Bytes => format_bytes(v),
            Unit::MegaBytes => format_bytes(v * 1024.0 * 1024.0),
            Unit::GigaBytes => format_bytes(v * 1024.0 * 1024.0 * 1024.0),
        }
    }
}

/// Compact SI formatting: `1234` -> `1.23k`, `0.00012` -> `1.2e-4`.
fn format_si(v: f64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "G"), (1e6, "M"), (1e3, "k")];

    let abs = v.abs();
    for (scale, suffix) in SUFFIXES {
        if abs >= scale {
            return format!("{}{}", format_sig_figs(v / scale, 3), suffix);
        }
    }
    if abs != 0.0 && abs < 1e-3 {
        return format_sig_figs(v, 2);
    }
    format_sig_figs(v, 3)
}

fn format_bytes(v: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut scaled = v;
    let mut idx = 0;
    while scaled.abs() >= 1024.0 && idx < UNITS.len() - 1 {
        scaled /= 1024.0;
        idx += 1;
    }
    format!("{}{}", format_sig_figs(scaled, 3), UNITS[idx])
}

/// Format `v` with `sig` significant figures, dropping trailing zeros.
///
/// Very large or very small magnitudes switch to scientific notation.
pub fn format_sig_figs(v: f64, sig: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }

    let sig = sig.max(1);
    let magnitude = v.abs().log10().floor() as i32;
    if !(-4..6).contains(&magnitude) {
        let formatted = format!("{:.*e}", sig - 1, v);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_zeros(mantissa), exp),
            None => formatted,
        };
    }

    let decimals = (sig as i32 - 1 - magnitude).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, v)).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.')
}

/// Format an X axis tick (usually a step count) to fit `max_width` columns.
///
/// Integral values print without decimals; values that do not fit fall back
/// to compact SI notation. A `max_width` of zero disables the fit check.
pub fn format_x_tick(v: f64, max_width: usize) -> String {
    let plain = if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format_sig_figs(v, 3)
    };
    if max_width == 0 || display_width(&plain) <= max_width {
        return plain;
    }
    format_si(v)
}

/// Terminal display width of `s`.
pub fn display_width(s: &str) -> usize {
    Span::raw(s).width()
}

/// Truncate a title to `max_width` columns, appending `...`.
///
/// When enough text remains, the cut prefers to land right after one of
/// `/ _ . - :` so that metric paths break at a component boundary.
pub fn truncate_title(title: &str, max_width: usize) -> String {
    const ELLIPSIS: &str = "...";
    const SEPARATORS: [char; 5] = ['/', '_', '.', '-', ':'];

    if display_width(title) <= max_width {
        return title.to_string();
    }
    if max_width <= ELLIPSIS.len() {
        return ELLIPSIS.to_string();
    }

    let available = max_width - ELLIPSIS.len();
    let chars: Vec<char> = title.chars().collect();

    // Longest char prefix that fits.
    let mut cut = 0;
    let mut width = 0;
    for (i, ch) in chars.iter().enumerate() {
        if width > available {
            break;
        }
        cut = i;
        width += display_width(ch.encode_utf8(&mut [0u8; 4]));
    }
    if width <= available {
        cut = chars.len();
    }

    if cut > available / 2 {
        let head: String = chars[..cut].iter().collect();
        for sep in SEPARATORS {
            if let Some(idx) = head.rfind(sep) {
                let at = head[..idx].chars().count();
                if at > cut * 2 / 3 {
                    cut = at + 1;
                    break;
                }
            }
        }
    }

    let cut = cut.clamp(1, chars.len());
    let mut out: String = chars[..cut].iter().collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sig_figs() {
        assert_eq!(format_sig_figs(0.0, 4), "0");
        assert_eq!(format_sig_figs(1.0, 4), "1");
        assert_eq!(format_sig_figs(0.123456, 4), "0.1235");
        assert_eq!(format_sig_figs(1234.5678, 4), "1235");
        assert_eq!(format_sig_figs(-2.5, 4), "-2.5");
        assert_eq!(format_sig_figs(1234567.0, 3), "1.23e6");
        assert_eq!(format_sig_figs(0.00001234, 2), "1.2e-5");
    }

    #[test]
    fn test_unit_format() {
        assert_eq!(Unit::Scalar.format(1500.0), "1.5k");
        assert_eq!(Unit::Scalar.format(2_000_000.0), "2M");
        assert_eq!(Unit::Scalar.format(0.25), "0.25");
        assert_eq!(Unit::Percent.format(42.0), "42%");
        assert_eq!(Unit::Bytes.format(2048.0), "2KB");
        assert_eq!(Unit::MegaBytes.format(1024.0), "1GB");
        assert_eq!(Unit::MegaHertz.format(1500.0), "1.5GHz");
        assert_eq!(Unit::Celsius.symbol(), "°C");
        assert_eq!(Unit::Scalar.symbol(), "");
    }

    #[test]
    fn test_x_tick() {
        assert_eq!(format_x_tick(100.0, 10), "100");
        assert_eq!(format_x_tick(2.5, 10), "2.5");
        assert_eq!(format_x_tick(125_000.0, 4), "125k");
        assert_eq!(format_x_tick(125_000.0, 0), "125000");
    }

    #[test]
    fn test_truncate_title_fits() {
        assert_eq!(truncate_title("train/loss", 20), "train/loss");
    }

    #[test]
    fn test_truncate_title_tiny() {
        assert_eq!(truncate_title("train/loss", 3), "...");
    }

    #[test]
    fn test_truncate_title_prefers_separator() {
        let out = truncate_title("train/very_long_metric_name", 16);
        assert!(out.ends_with("..."));
        assert!(display_width(&out) <= 16);
        assert_eq!(out, "train/very_...");
    }

    #[test]
    fn test_truncate_title_without_separator() {
        let out = truncate_title("abcdefghijklmnop", 10);
        assert_eq!(out, "abcdefg...");
    }
}
