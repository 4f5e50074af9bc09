use std::str::FromStr;

use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
    Unknown,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`.  Background values
/// 0–6 are considered dark; 7–15 are considered light.  If the variable is
/// absent or unparseable, `BackgroundType::Dark` is returned.
pub fn detect_background() -> BackgroundType {
    if let Ok(val) = std::env::var("COLORFGBG") {
        if let Some(bg) = val.split(';').next_back() {
            if let Ok(bg_num) = bg.parse::<u8>() {
                return if bg_num <= 6 {
                    BackgroundType::Dark
                } else {
                    BackgroundType::Light
                };
            }
        }
    }
    BackgroundType::Dark
}

/// Colour names accepted in chart definitions beyond ratatui's own, with
/// their RGB value and the closest basic ANSI colour.
const NAMED_COLORS: &[(&str, (u8, u8, u8), Color)] = &[
    ("skyblue", (135, 206, 235), Color::LightBlue),
    ("purple", (128, 0, 128), Color::Magenta),
    ("orange", (255, 165, 0), Color::LightRed),
    ("navy", (0, 0, 128), Color::Blue),
    ("teal", (0, 128, 128), Color::Cyan),
    ("olive", (128, 128, 0), Color::Yellow),
    ("brown", (165, 42, 42), Color::Red),
    ("pink", (255, 192, 203), Color::LightMagenta),
    ("gold", (255, 215, 0), Color::Yellow),
    ("steelblue", (70, 130, 180), Color::Blue),
];

/// Complete theme definition carrying all chart styles.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Frame ────────────────────────────────────────────────────────────────
    pub title: Style,
    pub border: Style,
    pub axis: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub label: Style,
    pub value: Style,
    pub dim: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    /// "No data" placeholder.
    pub warning: Style,
    pub error: Style,

    // ── Series ───────────────────────────────────────────────────────────────
    /// Bars and points when a chart names no colour.
    pub series: Style,
    /// Unfilled part of a share bar.
    pub share_empty: Style,
    /// Colours cycled through for pie slices.
    pub palette: Vec<Color>,

    /// Whether named colours may use 24-bit RGB.
    pub true_color: bool,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            axis: Style::default().fg(Color::Gray),

            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            dim: Style::default().fg(Color::DarkGray),

            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            series: Style::default().fg(Color::Cyan),
            share_empty: Style::default().fg(Color::DarkGray),
            palette: vec![
                Color::Green,
                Color::Red,
                Color::Cyan,
                Color::Yellow,
                Color::Magenta,
                Color::Blue,
            ],

            true_color: true,
        }
    }

    /// Light-background terminal theme.
    ///
    /// Uses dark colours for text so that content remains legible against a
    /// white/light-grey terminal canvas.
    pub fn light() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Gray),
            axis: Style::default().fg(Color::DarkGray),

            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            dim: Style::default().fg(Color::Gray),

            warning: Style::default().fg(Color::Magenta),
            error: Style::default().fg(Color::Red),

            series: Style::default().fg(Color::Blue),
            share_empty: Style::default().fg(Color::Gray),
            palette: vec![
                Color::Green,
                Color::Red,
                Color::Blue,
                Color::Magenta,
                Color::Cyan,
                Color::Black,
            ],

            true_color: true,
        }
    }

    /// Classic theme using only the basic ANSI palette and no bold.
    pub fn classic() -> Self {
        Self {
            title: Style::default().fg(Color::Cyan),
            border: Style::default().fg(Color::DarkGray),
            axis: Style::default().fg(Color::White),

            label: Style::default().fg(Color::Gray),
            value: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),

            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            series: Style::default().fg(Color::Green),
            share_empty: Style::default().fg(Color::DarkGray),
            palette: vec![
                Color::Green,
                Color::Red,
                Color::Yellow,
                Color::Cyan,
                Color::Magenta,
            ],

            true_color: false,
        }
    }

    /// Unstyled theme for plain-text output.
    pub fn plain() -> Self {
        Self {
            title: Style::default(),
            border: Style::default(),
            axis: Style::default(),
            label: Style::default(),
            value: Style::default(),
            dim: Style::default(),
            warning: Style::default(),
            error: Style::default(),
            series: Style::default(),
            share_empty: Style::default(),
            palette: vec![Color::Reset],
            true_color: false,
        }
    }

    /// Choose a theme automatically based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Construct a theme by name.  Falls back to `auto_detect` for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            "plain" => Self::plain(),
            _ => Self::auto_detect(),
        }
    }

    /// `true` when the theme applies no colour at all.
    pub fn is_plain(&self) -> bool {
        self.series == Style::default() && self.title == Style::default()
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    /// Series style for a chart, honouring its requested colour when the
    /// name is recognised.
    pub fn series_style(&self, color: Option<&str>) -> Style {
        if self.is_plain() {
            return self.series;
        }
        match color.and_then(|name| parse_color(name, self.true_color)) {
            Some(c) => Style::default().fg(c),
            None => self.series,
        }
    }

    /// Palette style for the `index`-th category.
    pub fn palette_style(&self, index: usize) -> Style {
        if self.is_plain() || self.palette.is_empty() {
            return self.series;
        }
        Style::default().fg(self.palette[index % self.palette.len()])
    }
}

/// Resolve a colour name: chart colour names such as `skyblue` or `purple`
/// first, then anything ratatui understands (`red`, `lightblue`, `#1e90ff`,
/// indexed colours). With `true_color` off, named colours map to the nearest
/// basic ANSI colour. Unknown names yield `None`.
pub fn parse_color(name: &str, true_color: bool) -> Option<Color> {
    let lower = name.trim().to_ascii_lowercase();
    if let Some((_, (r, g, b), ansi)) = NAMED_COLORS.iter().find(|(n, _, _)| *n == lower) {
        return Some(if true_color { Color::Rgb(*r, *g, *b) } else { *ansi });
    }
    Color::from_str(&lower).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
