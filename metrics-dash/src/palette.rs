//! Series colors.
//!
//! A [`Palette`] is an explicit list of graph colors passed into charts when
//! they are created. Series colors are picked by hashing the series name so
//! the same metric keeps its color across restarts. The hash lookups are
//! memoized in a [`PaletteCache`] owned by the grid.
//!
//! Colors live behind a [`StyleHandle`] so the grid can recolor a chart after
//! re-sorting while a render pass is reading the same style.

use std::num::NonZeroUsize;
use std::sync::Arc;

use arc_swap::ArcSwap;
use lru::LruCache;
use ratatui::style::{Color, Style};
use serde::{Deserialize, Serialize};

/// Default capacity of the name -> hash cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Named graph color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    #[default]
    SunsetGlow,
    Vibe10,
    Blues,
}

impl ColorScheme {
    /// Graph colors for this scheme.
    pub fn colors(self) -> Vec<Color> {
        match self {
            ColorScheme::SunsetGlow => vec![
                Color::Rgb(230, 113, 65),
                Color::Rgb(255, 149, 92),
                Color::Rgb(255, 180, 50),
                Color::Rgb(250, 211, 90),
                Color::Rgb(232, 92, 117),
                Color::Rgb(200, 80, 160),
                Color::Rgb(150, 100, 210),
                Color::Rgb(110, 130, 240),
            ],
            ColorScheme::Vibe10 => vec![
                Color::Rgb(0, 255, 255),
                Color::Rgb(255, 100, 255),
                Color::Rgb(100, 255, 100),
                Color::Rgb(255, 180, 50),
                Color::Rgb(100, 200, 255),
                Color::Rgb(255, 255, 0),
                Color::Rgb(255, 80, 80),
                Color::Rgb(150, 255, 150),
                Color::Rgb(255, 150, 255),
                Color::Rgb(0, 150, 255),
            ],
            ColorScheme::Blues => vec![
                Color::Rgb(8, 81, 156),
                Color::Rgb(49, 130, 189),
                Color::Rgb(107, 174, 214),
                Color::Rgb(158, 202, 225),
                Color::Rgb(198, 219, 239),
            ],
        }
    }
}

/// An ordered list of graph colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_scheme(ColorScheme::default())
    }
}

impl Palette {
    /// Build a palette from explicit colors. An empty list falls back to the
    /// default scheme.
    pub fn new(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            return Self::default();
        }
        Self { colors }
    }

    pub fn from_scheme(scheme: ColorScheme) -> Self {
        Self {
            colors: scheme.colors(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color at `index`, wrapping around.
    pub fn color_at(&self, index: usize) -> Color {
        self.colors[index % self.colors.len()]
    }

    /// Stable color for a series name.
    pub fn color_for(&self, name: &str) -> Color {
        self.color_at(fnv1a(name) as usize)
    }

    /// Stable color for a series name, memoizing the hash in `cache`.
    pub fn color_for_cached(&self, name: &str, cache: &mut PaletteCache) -> Color {
        self.color_at(cache.hash(name) as usize)
    }
}

/// Bounded memo of series name -> FNV-1a hash.
#[derive(Debug)]
pub struct PaletteCache {
    hashes: LruCache<String, u32>,
}

impl Default for PaletteCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PaletteCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            hashes: LruCache::new(capacity),
        }
    }

    pub fn hash(&mut self, name: &str) -> u32 {
        if let Some(sum) = self.hashes.get(name) {
            return *sum;
        }
        let sum = fnv1a(name);
        self.hashes.put(name.to_string(), sum);
        sum
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// 32-bit FNV-1a.
fn fnv1a(s: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    s.bytes()
        .fold(OFFSET_BASIS, |hash, b| (hash ^ u32::from(b)).wrapping_mul(PRIME))
}

/// Shared, atomically replaceable series style.
///
/// Clones point at the same slot: a `store` through one clone is seen by every
/// other clone on its next `load`.
#[derive(Debug, Clone)]
pub struct StyleHandle(Arc<ArcSwap<Style>>);

impl StyleHandle {
    pub fn new(style: Style) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(style)))
    }

    pub fn load(&self) -> Style {
        **self.0.load()
    }

    pub fn store(&self, style: Style) {
        self.0.store(Arc::new(style));
    }

    /// Whether two handles share the same slot.
    pub fn ptr_eq(&self, other: &StyleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for StyleHandle {
    fn default() -> Self {
        Self::new(Style::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
    }

    #[test]
    fn test_color_is_stable_per_name() {
        let palette = Palette::default();
        let mut cache = PaletteCache::new(4);
        let a = palette.color_for("train/loss");
        assert_eq!(a, palette.color_for("train/loss"));
        assert_eq!(a, palette.color_for_cached("train/loss", &mut cache));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut cache = PaletteCache::new(2);
        cache.hash("a");
        cache.hash("b");
        cache.hash("c");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_palette_falls_back() {
        let palette = Palette::new(Vec::new());
        assert_eq!(palette, Palette::default());
        assert!(!palette.is_empty());
    }

    #[test]
    fn test_style_handle_shared_swap() {
        let handle = StyleHandle::new(Style::default().fg(Color::Red));
        let reader = handle.clone();
        handle.store(Style::default().fg(Color::Blue));
        assert_eq!(reader.load().fg, Some(Color::Blue));
        assert!(reader.ptr_eq(&handle));
        assert!(!reader.ptr_eq(&StyleHandle::default()));
    }

    #[test]
    fn test_scheme_serde_names() {
        let json = serde_json::to_string(&ColorScheme::Vibe10).unwrap();
        assert_eq!(json, "\"vibe10\"");
        let scheme: ColorScheme = serde_json::from_str("\"sunset-glow\"").unwrap();
        assert_eq!(scheme, ColorScheme::SunsetGlow);
    }
}
